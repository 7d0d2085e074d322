use crate::error::SqlTestError;

/// Strip a leading `@` and check the rest is a plain identifier.
///
/// # Errors
/// Returns `SqlTestError::ParameterError` for empty names or names with
/// characters other than ASCII letters, digits and `_`.
pub fn normalize_param_name(name: &str) -> Result<&str, SqlTestError> {
    let bare = name.strip_prefix('@').unwrap_or(name);
    if bare.is_empty() || !bare.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(SqlTestError::ParameterError(format!(
            "invalid parameter name: {name:?}"
        )));
    }
    Ok(bare)
}

/// Check that `name` is a one- to four-part object name.
///
/// Each dot-separated part is either a run of ASCII letters, digits and `_`
/// or a `[...]`-bracketed identifier in which `]]` stands for `]`.
///
/// # Errors
/// Returns `SqlTestError::ParameterError` for anything else.
pub fn validate_proc_name(name: &str) -> Result<&str, SqlTestError> {
    let invalid =
        || SqlTestError::ParameterError(format!("invalid stored procedure name: {name:?}"));
    let mut rest = name;
    let mut parts = 0;
    loop {
        rest = if let Some(quoted) = rest.strip_prefix('[') {
            let len = bracketed_len(quoted).ok_or_else(invalid)?;
            &quoted[len..]
        } else {
            let len = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(rest.len());
            if len == 0 {
                return Err(invalid());
            }
            &rest[len..]
        };

        parts += 1;
        if parts > 4 {
            return Err(invalid());
        }
        match rest.strip_prefix('.') {
            Some(next) => rest = next,
            None if rest.is_empty() => return Ok(name),
            None => return Err(invalid()),
        }
    }
}

/// Byte length of a bracketed identifier's body and closing `]`.
fn bracketed_len(quoted: &str) -> Option<usize> {
    let bytes = quoted.as_bytes();
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b']' {
            if bytes.get(idx + 1) == Some(&b']') {
                idx += 2;
                continue;
            }
            return (idx > 0).then_some(idx + 1);
        }
        idx += 1;
    }
    None
}

/// Build `EXEC <proc> @a = @P1, @b = @P2, ...` for the given input names.
///
/// Positional placeholders follow the order of `names`, so values must be
/// bound in the same order.
///
/// # Errors
/// Returns `SqlTestError::ParameterError` if the procedure name or any input
/// name is invalid.
pub fn build_exec_statement<'a, I>(proc_name: &str, names: I) -> Result<String, SqlTestError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut sql = format!("EXEC {}", validate_proc_name(proc_name)?);
    for (idx, name) in names.into_iter().enumerate() {
        let bare = normalize_param_name(name)?;
        sql.push_str(if idx == 0 { " " } else { ", " });
        sql.push_str(&format!("@{bare} = @P{}", idx + 1));
    }
    Ok(sql)
}
