//! Fixed sample snippets shown next to the style selectors.

use super::config::{IfStyle, TupleStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum PreviewKind {
    IfStyle,
    TupleStyle,
}

const IF_INDENTED: &str = "\
if condition
  then expr1
  else expr2

-- Chained:
if cond1
  then expr1
  else if cond2
    then expr2
    else expr3";

const IF_HANGING: &str = "\
if condition then
    expr1
else
    expr2

-- Chained:
if cond1 then
    expr1
else if cond2 then
    expr2
else
    expr3";

const TUPLE_SPACED: &str = "\
point = ( 1, 2, 3 )

-- Multi-line:
coords =
    ( x
    , y
    , z
    )";

const TUPLE_COMPACT: &str = "\
point = (1, 2, 3)

-- Multi-line:
coords =
    ( x
    , y
    , z
    )";

pub fn if_style_preview(style: IfStyle) -> &'static str {
    match style {
        IfStyle::Indented => IF_INDENTED,
        IfStyle::Hanging => IF_HANGING,
    }
}

pub fn tuple_style_preview(style: TupleStyle) -> &'static str {
    match style {
        TupleStyle::Spaced => TUPLE_SPACED,
        TupleStyle::Compact => TUPLE_COMPACT,
    }
}
