//! Parsing of the textual reference values found in compiled programs, e.g.
//! `[cast([fp + (-4)] + 2, felt*)]`.
//!
//! A reference is an optional outer dereference around a `cast(expr, type)`,
//! where `expr` is at most two terms joined by ` + ` or ` - `. Each term is a
//! register with an optional offset, a number, or one of those inside brackets.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until},
    character::complete::{char, i32 as signed_i32},
    combinator::{opt, rest, value},
    error::{Error, ErrorKind},
    sequence::{delimited, preceded, separated_pair},
    Err, IResult,
};

use crate::{
    serde::deserialize_program::{OffsetValue, ValueAddress},
    types::instruction::Register,
    Felt252,
};

/// Prepends a `0` to hex strings of odd length.
pub(crate) fn maybe_add_padding(mut hex: String) -> String {
    if hex.len() % 2 != 0 {
        hex.insert(0, '0');
    }
    hex
}

/// Consumes input up to the closing bracket that balances an opening bracket
/// already consumed by the caller. The closing bracket itself is not consumed.
fn take_until_unbalanced(open: char, close: char) -> impl Fn(&str) -> IResult<&str, &str> {
    move |input: &str| {
        let mut depth = 0usize;
        for (index, c) in input.char_indices() {
            if c == open {
                depth += 1;
            } else if c == close {
                if depth == 0 {
                    return Ok((&input[index..], &input[..index]));
                }
                depth -= 1;
            }
        }
        Err(Err::Error(Error::new(input, ErrorKind::TakeUntil)))
    }
}

fn bracketed(open: char, close: char) -> impl Fn(&str) -> IResult<&str, &str> {
    move |input: &str| delimited(char(open), take_until_unbalanced(open, close), char(close))(input)
}

/// Strips the outer `[...]`, reporting whether it was present.
fn outer_dereference(input: &str) -> IResult<&str, bool> {
    match bracketed('[', ']')(input) {
        Ok(("", inner)) => Ok((inner, true)),
        _ => Ok((input, false)),
    }
}

/// Splits `cast(expr, type)` into `expr` and `type`.
fn cast_arguments(input: &str) -> IResult<&str, (&str, &str)> {
    let (remaining, arguments) = preceded(tag("cast"), bracketed('(', ')'))(input)?;
    let (_, split) = separated_pair(take_until(", "), tag(", "), rest)(arguments)?;
    Ok((remaining, split))
}

fn register(input: &str) -> IResult<&str, Option<Register>> {
    opt(alt((
        value(Register::AP, tag("ap")),
        value(Register::FP, tag("fp")),
    )))(input)
}

/// A number, possibly negative, optionally wrapped in parentheses.
fn number(input: &str) -> IResult<&str, i32> {
    alt((delimited(char('('), signed_i32, char(')')), signed_i32))(input)
}

/// ` + n`, ` - n`, a bare `n`, or nothing at all (zero).
fn offset(input: &str) -> IResult<&str, i32> {
    if input.is_empty() {
        return Ok((input, 0));
    }
    let (input, sign) = opt(alt((value(1, tag(" + ")), value(-1, tag(" - ")))))(input)?;
    let (input, n) = number(input)?;
    Ok((input, sign.unwrap_or(1) * n))
}

fn register_and_offset(input: &str) -> IResult<&str, (Option<Register>, i32)> {
    let (input, register) = register(input)?;
    let (input, offset) = offset(input)?;
    Ok((input, (register, offset)))
}

fn to_offset_value((register, offset): (Option<Register>, i32), dereference: bool) -> OffsetValue {
    match register {
        Some(register) => OffsetValue::Reference(register, offset, dereference),
        None => OffsetValue::Value(offset),
    }
}

/// A bracketed term such as `[fp + (-4)]`, optionally preceded by ` + `.
fn dereferenced_term(input: &str) -> IResult<&str, OffsetValue> {
    let (input, _) = opt(alt((tag(" + "), tag(" - "))))(input)?;
    let (input, inner) = bracketed('[', ']')(input)?;
    let (_, parsed) = register_and_offset(inner)?;
    Ok((input, to_offset_value(parsed, true)))
}

fn plain_term(input: &str) -> IResult<&str, OffsetValue> {
    let (input, parsed) = register_and_offset(input)?;
    Ok((input, to_offset_value(parsed, false)))
}

fn term(input: &str) -> IResult<&str, OffsetValue> {
    if input.is_empty() {
        return Ok((input, OffsetValue::Value(0)));
    }
    alt((dereferenced_term, plain_term))(input)
}

/// Offsets of a plain `felt` reference are the value itself, not a location.
fn as_immediate(offset: OffsetValue) -> OffsetValue {
    match offset {
        OffsetValue::Value(value) => OffsetValue::Immediate(Felt252::from(value)),
        other => other,
    }
}

/// Parses a reference value into a [`ValueAddress`].
pub(crate) fn parse_value(input: &str) -> IResult<&str, ValueAddress> {
    let (input, dereference) = outer_dereference(input)?;
    let (remaining, (expression, value_type)) = cast_arguments(input)?;
    let (expression, first) = term(expression)?;
    let (_, second) = term(expression)?;

    let (offset1, offset2) = if value_type == "felt" {
        (as_immediate(first), as_immediate(second))
    } else {
        (first, second)
    };

    Ok((
        remaining,
        ValueAddress {
            offset1,
            offset2,
            dereference,
            value_type: value_type.to_string(),
        },
    ))
}
