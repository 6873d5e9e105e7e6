//! Nom-based IRC line parser.

use nom::{
    bytes::complete::take_while1,
    character::complete::{char, space0},
    combinator::opt,
    error::ErrorKind,
    sequence::preceded,
    IResult,
};
use smallvec::SmallVec;

use crate::error::MessageParseError;

/// Skip IRCv3 tags; the client does not request any capability that sends them,
/// but servers may still attach them.
fn parse_tags(input: &str) -> IResult<&str, &str> {
    preceded(char('@'), take_while1(|c| c != ' '))(input)
}

fn parse_prefix(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), take_while1(|c| c != ' '))(input)
}

/// Command name: 1*letter or 3digit.
fn parse_command(input: &str) -> IResult<&str, &str> {
    let (rest, cmd) = take_while1(|c: char| c.is_ascii_alphanumeric())(input)?;

    let is_all_letters = cmd.chars().all(|c| c.is_ascii_alphabetic());
    let is_three_digits = cmd.len() == 3 && cmd.chars().all(|c| c.is_ascii_digit());

    if is_all_letters || is_three_digits {
        Ok((rest, cmd))
    } else {
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            ErrorKind::AlphaNumeric,
        )))
    }
}

/// Split parameters. Runs of spaces separate parameters; a `:` starts the
/// trailing parameter, which keeps its internal spaces.
fn parse_params(input: &str) -> SmallVec<[&str; 15]> {
    let mut params: SmallVec<[&str; 15]> = SmallVec::new();
    let mut rest = input;

    while rest.starts_with(' ') {
        if params.len() >= 15 {
            break;
        }

        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            break;
        }

        if let Some(trailing) = rest.strip_prefix(':') {
            params.push(trailing);
            break;
        }

        let end = rest.find(' ').unwrap_or(rest.len());
        params.push(&rest[..end]);
        rest = &rest[end..];
    }

    params
}

/// A parsed line with borrowed slices into the input.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParsedLine<'a> {
    pub prefix: Option<&'a str>,
    pub command: &'a str,
    pub params: SmallVec<[&'a str; 15]>,
}

fn parse_line(input: &str) -> IResult<&str, ParsedLine<'_>> {
    let (input, _) = opt(parse_tags)(input)?;
    let (input, _) = space0(input)?;
    let (input, prefix) = opt(parse_prefix)(input)?;
    let (input, _) = space0(input)?;
    let (input, command) = parse_command(input)?;
    let params = parse_params(input);

    Ok((
        "",
        ParsedLine {
            prefix,
            command,
            params,
        },
    ))
}

impl<'a> ParsedLine<'a> {
    /// Parse a single line (without its CR/LF terminator).
    pub fn parse(input: &'a str) -> Result<Self, MessageParseError> {
        let line = input.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }

        match parse_line(line) {
            Ok((_, parsed)) => Ok(parsed),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                Err(MessageParseError::InvalidCommand {
                    position: line.len() - e.input.len(),
                })
            }
            Err(nom::Err::Incomplete(_)) => Err(MessageParseError::InvalidCommand {
                position: line.len(),
            }),
        }
    }
}
