pub mod car;
pub mod track;
pub mod trk;

use nom::IResult;

/// Non-blank lines of `text`, numbered from 1
pub(crate) fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
	text.lines()
		.enumerate()
		.map(|(i, l)| (i + 1, l))
		.filter(|(_, l)| !l.trim().is_empty())
}

/// Runs `parser` over the next line.
///
/// Fails with the offending line, or with `None` if there are no lines left.
pub(crate) fn parse_line<'a, I, O, F>(lines: &mut I, mut parser: F) -> Result<O, Option<(usize, String)>>
where
	I: Iterator<Item = (usize, &'a str)>,
	F: FnMut(&'a str) -> IResult<&'a str, O>,
{
	let (i, text) = lines.next().ok_or(None)?;

	parser(text)
		.map(|(_, o)| o)
		.map_err(|_| Some((i, text.to_string())))
}
