//! Interactive input for values the operator left off the command line.

use anyhow::{bail, Context, Result};
use std::io::{BufRead, Write};

/// Print `label`, read one line, and return it trimmed.
///
/// Fails on end of input.
pub fn read_line(label: &str, input: &mut dyn BufRead, output: &mut dyn Write) -> Result<String> {
    write!(output, "{}", label)?;
    output.flush()?;

    let mut line = String::new();
    let read = input.read_line(&mut line).context("failed to read from stdin")?;
    if read == 0 {
        bail!("no input provided");
    }
    Ok(line.trim().to_string())
}

/// Ask for the URL to scrape. An empty answer is an error.
pub fn prompt_url(input: &mut dyn BufRead, output: &mut dyn Write) -> Result<String> {
    let url = read_line("Enter the URL to scrape: ", input, output)?;
    if url.is_empty() {
        bail!("no URL provided");
    }
    Ok(url)
}

/// Show a numbered list and return the chosen entry.
///
/// Accepts either the 1-based number or the exact name.
pub fn choose<'a>(
    title: &str,
    options: &'a [String],
    input: &mut dyn BufRead,
    output: &mut dyn Write,
) -> Result<&'a str> {
    writeln!(output, "{}", title)?;
    for (i, option) in options.iter().enumerate() {
        writeln!(output, "  {:>2}. {}", i + 1, option)?;
    }

    let answer = read_line(&format!("Select [1-{}]: ", options.len()), input, output)?;
    if let Ok(n) = answer.parse::<usize>() {
        if (1..=options.len()).contains(&n) {
            return Ok(options[n - 1].as_str());
        }
        bail!("selection {} is out of range (1-{})", n, options.len());
    }
    match options.iter().find(|o| **o == answer) {
        Some(o) => Ok(o.as_str()),
        None => bail!("unknown selection '{}'", answer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn options() -> Vec<String> {
        vec!["alpha".to_string(), "beta".to_string()]
    }

    #[test]
    fn prompt_url_trims_answer() {
        let mut out = Vec::new();
        let url = prompt_url(&mut Cursor::new("  https://example.com/page \n"), &mut out).unwrap();
        assert_eq!(url, "https://example.com/page");
        assert_eq!(String::from_utf8(out).unwrap(), "Enter the URL to scrape: ");
    }

    #[test]
    fn prompt_url_rejects_empty_and_eof() {
        let mut out = Vec::new();
        assert!(prompt_url(&mut Cursor::new("\n"), &mut out).is_err());
        assert!(prompt_url(&mut Cursor::new(""), &mut out).is_err());
    }

    #[test]
    fn choose_by_number_or_name() {
        let opts = options();
        let mut out = Vec::new();
        assert_eq!(choose("Buckets:", &opts, &mut Cursor::new("2\n"), &mut out).unwrap(), "beta");
        assert_eq!(choose("Buckets:", &opts, &mut Cursor::new("alpha\n"), &mut out).unwrap(), "alpha");
        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("   1. alpha\n"));
        assert!(shown.contains("Select [1-2]: "));
    }

    #[test]
    fn choose_rejects_out_of_range() {
        let opts = options();
        let mut out = Vec::new();
        let err = choose("Buckets:", &opts, &mut Cursor::new("3\n"), &mut out).unwrap_err();
        assert!(err.to_string().contains("out of range"));
        assert!(choose("Buckets:", &opts, &mut Cursor::new("gamma\n"), &mut out).is_err());
    }
}
