use winnow::combinator::{alt, cut_err, delimited, repeat};
use winnow::error::{ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::take_while;

/// One piece of a parsed template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'i> {
    Literal(&'i str),
    /// Raw text between a `{` and its closing `}`.
    Field(&'i str),
}

fn escaped_open<'i>(input: &mut &'i str) -> ModalResult<Segment<'i>> {
    "{{".value(Segment::Literal("{")).parse_next(input)
}

fn escaped_close<'i>(input: &mut &'i str) -> ModalResult<Segment<'i>> {
    "}}".value(Segment::Literal("}")).parse_next(input)
}

fn field<'i>(input: &mut &'i str) -> ModalResult<Segment<'i>> {
    delimited(
        '{',
        take_while(0.., |c: char| c != '{' && c != '}'),
        cut_err('}').context(StrContext::Expected(StrContextValue::CharLiteral('}'))),
    )
    .map(Segment::Field)
    .parse_next(input)
}

fn literal<'i>(input: &mut &'i str) -> ModalResult<Segment<'i>> {
    take_while(1.., |c: char| c != '{' && c != '}')
        .map(Segment::Literal)
        .parse_next(input)
}

pub(crate) fn segments<'i>(input: &mut &'i str) -> ModalResult<Vec<Segment<'i>>> {
    repeat(0.., alt((escaped_open, escaped_close, field, literal))).parse_next(input)
}
