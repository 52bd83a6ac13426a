// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "note.pest"]
struct TemplateParser;

#[derive(Debug, PartialEq, Eq)]
pub enum Piece<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}

/// Split one line of a note into literal text and placeholder names.
pub fn pieces(line: &str) -> Vec<Piece> {
    let template = match TemplateParser::parse(Rule::template, line).ok().and_then(|mut p| p.next()) {
        Some(pair) => pair,
        None => return vec![Piece::Text(line)],
    };
    template.into_inner().filter_map(|pair| match pair.as_rule() {
        Rule::text => Some(Piece::Text(pair.as_str())),
        Rule::placeholder => {
            let name = pair.into_inner().next().map_or("", |n| n.as_str());
            Some(Piece::Placeholder(name))
        }
        _ => None,
    }).collect()
}
