use nom::{
	bytes::complete::take_till,
	character::complete::{
		char,
		not_line_ending,
		space0
	},
	combinator::{
		all_consuming,
		map,
		opt,
		value
	},
	error::ParseError,
	IResult,
	multi::count,
	number::complete::float,
	Parser,
	sequence::{
		delimited,
		pair,
		separated_pair,
		terminated,
		tuple
	}
};

use ultraviolet::vec::Vec3;

/// Parses a hash-prefixed ('#') line comment
pub fn hash_comment<'a, E>(input: &'a str) -> IResult<&'a str, (), E>
where
	E: ParseError<&'a str>
{
	value((), pair(char('#'), not_line_ending))(input)
}

/// Parses a [`Vec3`] of whitespace-delimited floats
pub fn vec3ws<'a, E>(input: &'a str) -> IResult<&'a str, Vec3, E>
where
	E: ParseError<&'a str>
{
	let (input, f3vec) = count(ws(float), 3)(input)?;

	Ok((input, Vec3::new(f3vec[0], f3vec[1], f3vec[2])))
}

/// Parses a [`Vec3`] of comma-delimited floats, ignoring any trailing `#` comment
pub fn vec3cs<'a, E>(input: &'a str) -> IResult<&'a str, Vec3, E>
where
	E: ParseError<&'a str>
{
	map(
		terminated(
			tuple((ws(float), char(','), ws(float), char(','), ws(float))),
			opt(hash_comment)
		),
		|(x, _, y, _, z)| Vec3::new(x, y, z)
	)(input)
}

/// Parses a `key = value` line, returning both sides trimmed.
///
/// Only the first `sep` splits the line, so values may contain the separator.
pub fn key_value<'a, E>(sep: char) -> impl FnMut(&'a str) -> IResult<&'a str, (&'a str, &'a str), E>
where
	E: ParseError<&'a str>
{
	move |input: &'a str| {
		map(
			separated_pair(take_till(|c: char| c == sep), char(sep), not_line_ending),
			|(k, v): (&str, &str)| (k.trim(), v.trim())
		)(input)
	}
}

/// Runs `inner` over a whole line, failing if anything but spaces is left over
pub fn line<'a, F, O, E>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O, E>
where
	E: ParseError<&'a str>,
	F: Parser<&'a str, O, E>,
{
	all_consuming(terminated(inner, space0))
}

/// A combinator that takes a parser `inner` and produces a parser that also consumes both leading and
/// trailing spaces, returning the output of `inner`.
pub fn ws<'a, F, O, E>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O, E>
where
	E: ParseError<&'a str>,
	F: Parser<&'a str, O, E>,
{
	delimited(space0, inner, space0)
}
