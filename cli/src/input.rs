use std::io::BufRead;

use anyhow::{bail, Context, Result};

/// Subject and number from the first two arguments, or else from the first
/// line of `reader`.
pub fn course_from_input(args: &[String], reader: impl BufRead) -> Result<(String, String)> {
    if let [subject, number, ..] = args {
        return Ok((subject.clone(), number.clone()));
    }

    let line = match reader.lines().next() {
        Some(line) => line.context("error reading input")?,
        None => bail!("no input provided"),
    };

    match line.split_whitespace().collect::<Vec<_>>()[..] {
        [subject, number, ..] => Ok((subject.to_owned(), number.to_owned())),
        _ => bail!("input must contain at least two fields"),
    }
}

/// Subject/number pairs from positional arguments.
pub fn course_pairs(args: &[String]) -> Result<Vec<(String, String)>> {
    if args.is_empty() || args.len() % 2 != 0 {
        bail!("expected SUBJECT NUMBER pairs, got {} arguments", args.len());
    }

    Ok(args
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect())
}
