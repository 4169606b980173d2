//! Operator confirmation before touching a database.

use dialoguer::Input;
use mssql_snapshot::MigrateError;

/// Answers that confirm an operation, compared after trimming and uppercasing.
const AFFIRMATIVE: [&str; 4] = ["SI", "SÍ", "YES", "S"];

/// Ask `prompt` and report whether the operator confirmed.
pub fn confirm(prompt: &str) -> Result<bool, MigrateError> {
    let answer: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .map_err(|e| MigrateError::Io(std::io::Error::other(e.to_string())))?;
    Ok(is_affirmative(&answer))
}

pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim().to_uppercase();
    AFFIRMATIVE.contains(&answer.as_str())
}
