//! Answer post-processing: citation stripping and source attribution.

use regex::{Captures, Regex};
use std::sync::OnceLock;
use support_core::{AnswerResult, EvidenceBundle, RouteDecision, SourceDescriptor};

/// Answer returned when no evidence was found. Synthesis is skipped.
pub const NO_CONTEXT_ANSWER: &str = "I couldn't find relevant information. Please provide more \
specific details or check your uploaded documents.";

/// One inline tag: `[Source 2]`, `(Source 1)`, `[Sources 1, 3]`, `[source: 4]`.
const CITATION_TAG: &str = r"[\[(][ \t]*sources?[ \t]*[:#]?[ \t]*\d[^\[\]()\n]*[\])]";

/// Punctuation that closes up against the text before a removed tag.
const CLOSING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')'];

/// A run of tags joined by whitespace, `,` or `;`, with the blanks around it.
fn citation_run() -> Option<&'static Regex> {
    static RUN: OnceLock<Option<Regex>> = OnceLock::new();
    RUN.get_or_init(|| {
        let pattern = format!(
            r"(?i)(?P<lead>[ \t]*)(?:{tag})(?:[ \t]*[,;]?[ \t]*(?:{tag}))*(?P<trail>[ \t]*)",
            tag = CITATION_TAG
        );
        Regex::new(&pattern)
            .map_err(|e| tracing::error!("Invalid citation pattern: {}", e))
            .ok()
    })
    .as_ref()
}

/// What replaces a removed run, given its neighbours.
///
/// Only the blanks swallowed with the run are rewritten; text outside it
/// is never touched.
fn removal_gap(prev: Option<char>, next: Option<char>, lead: &str, trail: &str) -> String {
    let at_line_start = matches!(prev, None | Some('\n'));
    match next {
        None | Some('\n') | Some('\r') => String::new(),
        _ if at_line_start => lead.to_string(),
        Some(c) if CLOSING_PUNCTUATION.contains(&c) => String::new(),
        _ if lead.is_empty() && trail.is_empty() => String::new(),
        _ => " ".to_string(),
    }
}

fn strip_pass(text: &str) -> String {
    let Some(run) = citation_run() else {
        return text.to_string();
    };

    run.replace_all(text, |caps: &Captures| {
        let Some(whole) = caps.get(0) else {
            return String::new();
        };
        let prev = text[..whole.start()].chars().next_back();
        let next = text[whole.end()..].chars().next();
        let lead = caps.name("lead").map_or("", |m| m.as_str());
        let trail = caps.name("trail").map_or("", |m| m.as_str());
        removal_gap(prev, next, lead, trail)
    })
    .into_owned()
}

/// Remove inline citation tags and the blanks or punctuation gaps they leave.
///
/// Text without tags comes back unchanged. Passes repeat until nothing
/// changes, so `strip_citations(&strip_citations(x)) == strip_citations(x)`;
/// every replacement is shorter than the run it replaces, so the loop
/// terminates.
pub fn strip_citations(text: &str) -> String {
    let mut current = strip_pass(text);
    loop {
        let next = strip_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// One descriptor per evidence item, in bundle order, numbered from 1.
pub fn build_sources(bundle: &EvidenceBundle) -> Vec<SourceDescriptor> {
    bundle
        .items()
        .iter()
        .enumerate()
        .map(|(i, item)| SourceDescriptor {
            id: i + 1,
            label: item.label().to_string(),
            relevance_percent: item.relevance_percent(),
            kind: item.kind(),
        })
        .collect()
}

/// The fixed answer for an empty bundle.
pub fn no_context_result(query: &str, route: RouteDecision) -> AnswerResult {
    AnswerResult {
        answer: NO_CONTEXT_ANSWER.to_string(),
        sources: Vec::new(),
        has_context: false,
        query: query.to_string(),
        route,
    }
}

/// Assemble the final result from the synthesizer's raw text.
///
/// An empty bundle always yields the fixed apology, whatever `raw_answer` says.
pub fn process(
    raw_answer: &str,
    bundle: &EvidenceBundle,
    query: &str,
    route: RouteDecision,
) -> AnswerResult {
    if bundle.is_empty() {
        return no_context_result(query, route);
    }

    AnswerResult {
        answer: strip_citations(raw_answer).trim().to_string(),
        sources: build_sources(bundle),
        has_context: bundle.has_context(),
        query: query.to_string(),
        route,
    }
}
