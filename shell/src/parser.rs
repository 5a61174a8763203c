use crate::command::ArgVector;
use crate::error::ShellError;
use crate::pipeline::Pipeline;

/// Token separating pipeline stages.
pub const STAGE_SEPARATOR: char = '|';

/// Split one input line into a pipeline.
///
/// Stages are separated by `|` and split into words on whitespace; no
/// quoting, escaping or expansion is performed. A blank line yields
/// `Ok(None)`. A line that has content but an empty stage (`ls | | wc`,
/// `| sort`) is a parse error.
pub fn parse_line(line: &str) -> Result<Option<Pipeline>, ShellError> {
    if line.trim().is_empty() {
        return Ok(None);
    }

    let stages = line
        .split(STAGE_SEPARATOR)
        .enumerate()
        .map(|(index, segment)| {
            let words: Vec<&str> = segment.split_whitespace().collect();
            if words.is_empty() {
                return Err(ShellError::EmptyStage { index });
            }
            ArgVector::new(words)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Pipeline::new(stages).map(Some)
}
