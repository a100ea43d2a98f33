//! Macro substitution engine.
//!
//! Fragments are named Brainfuck snippets that may reference other
//! fragments with `{name}`. Expansion resolves every reference inline,
//! memoising each fully-expanded fragment, and drops every character that
//! is neither one of the eight commands nor part of a reference, so the
//! result is a single minified program.
//!
//! The fragment graph is acyclic by construction; a cycle or an undefined
//! reference is a fatal generation-time error.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::code::Fragment;

/// Errors surfaced while expanding the fragment graph.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpandError {
    #[error("undefined fragment `{name}` referenced from `{site}`")]
    Undefined { name: String, site: String },
    #[error("cyclic fragment reference through `{name}`")]
    Cycle { name: String },
    #[error("unterminated reference in fragment `{site}`")]
    Unterminated { site: String },
}

enum Tok {
    Lit(String),
    Call(String),
}

/// A set of named fragments plus the expansion pass over them.
#[derive(Default)]
pub struct MacroSet {
    frags: HashMap<String, Vec<Tok>>,
}

const COMMANDS: &str = "+-<>[],.";

fn tokenize(name: &str, body: &str) -> Result<Vec<Tok>, ExpandError> {
    let mut toks = Vec::new();
    let mut lit = String::new();
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch == '{' {
            if !lit.is_empty() {
                toks.push(Tok::Lit(std::mem::take(&mut lit)));
            }
            let mut target = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => target.push(c),
                    None => {
                        return Err(ExpandError::Unterminated { site: name.into() });
                    }
                }
            }
            toks.push(Tok::Call(target));
        } else if COMMANDS.contains(ch) {
            lit.push(ch);
        }
        // Anything else is comment or whitespace and is dropped.
    }
    if !lit.is_empty() {
        toks.push(Tok::Lit(lit));
    }
    Ok(toks)
}

impl MacroSet {
    pub fn new() -> Self {
        MacroSet::default()
    }

    /// Register a named snippet. A later registration under the same name
    /// replaces the earlier one.
    pub fn register(&mut self, name: &str, body: &str) -> Result<(), ExpandError> {
        let toks = tokenize(name, body)?;
        log::trace!("registered fragment `{name}` ({} tokens)", toks.len());
        self.frags.insert(name.to_owned(), toks);
        Ok(())
    }

    /// Register a sealed [`Fragment`] under its own name.
    pub fn add(&mut self, frag: &Fragment) -> Result<(), ExpandError> {
        self.register(frag.name, &frag.body)
    }

    /// Expand `root` into a single minified Brainfuck string.
    pub fn expand(&self, root: &str) -> Result<String, ExpandError> {
        log::debug!("expanding fragment graph from `{root}`");
        let mut memo: HashMap<&str, String> = HashMap::new();
        let mut visiting: HashSet<&str> = HashSet::new();
        let expanded = self.expand_one(root, root, &mut memo, &mut visiting)?;
        log::debug!("expanded `{root}` to {} commands", expanded.len());
        Ok(expanded)
    }

    fn expand_one<'a>(
        &'a self,
        name: &str,
        site: &str,
        memo: &mut HashMap<&'a str, String>,
        visiting: &mut HashSet<&'a str>,
    ) -> Result<String, ExpandError> {
        let (key, toks) = match self.frags.get_key_value(name) {
            Some((key, toks)) => (key.as_str(), toks),
            None => {
                return Err(ExpandError::Undefined {
                    name: name.into(),
                    site: site.into(),
                });
            }
        };
        if let Some(done) = memo.get(key) {
            return Ok(done.clone());
        }
        if !visiting.insert(key) {
            return Err(ExpandError::Cycle { name: name.into() });
        }
        let mut out = String::new();
        for tok in toks {
            match tok {
                Tok::Lit(text) => out.push_str(text),
                Tok::Call(target) => {
                    let inner = self.expand_one(target, key, memo, visiting)?;
                    out.push_str(&inner);
                }
            }
        }
        visiting.remove(key);
        memo.insert(key, out.clone());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_fragment_passes_through() {
        let mut set = MacroSet::new();
        set.register("a", "+-<>").unwrap();
        assert_eq!(set.expand("a").unwrap(), "+-<>");
    }

    #[test]
    fn comments_and_whitespace_are_stripped() {
        let mut set = MacroSet::new();
        set.register("a", "+ move right > then stop\n  [-]").unwrap();
        assert_eq!(set.expand("a").unwrap(), "+>[-]");
    }

    #[test]
    fn references_expand_inline() {
        let mut set = MacroSet::new();
        set.register("zero", "[-]").unwrap();
        set.register("two", "{zero}++").unwrap();
        set.register("main", ">{two}<{two}").unwrap();
        assert_eq!(set.expand("main").unwrap(), ">[-]++<[-]++");
    }

    #[test]
    fn shared_fragments_expand_identically_at_each_site() {
        let mut set = MacroSet::new();
        set.register("inner", "+[->+<]").unwrap();
        set.register("main", "{inner}{inner}{inner}").unwrap();
        let out = set.expand("main").unwrap();
        assert_eq!(out, "+[->+<]".repeat(3));
    }

    #[test]
    fn undefined_reference_is_fatal() {
        let mut set = MacroSet::new();
        set.register("main", "{missing}").unwrap();
        assert_eq!(
            set.expand("main").unwrap_err(),
            ExpandError::Undefined {
                name: "missing".into(),
                site: "main".into()
            }
        );
    }

    #[test]
    fn cycle_is_fatal() {
        let mut set = MacroSet::new();
        set.register("a", "{b}").unwrap();
        set.register("b", "{a}").unwrap();
        assert_eq!(
            set.expand("a").unwrap_err(),
            ExpandError::Cycle { name: "a".into() }
        );
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let mut set = MacroSet::new();
        set.register("a", "+{a}").unwrap();
        assert_eq!(
            set.expand("a").unwrap_err(),
            ExpandError::Cycle { name: "a".into() }
        );
    }

    #[test]
    fn unterminated_reference_is_fatal() {
        let mut set = MacroSet::new();
        let err = set.register("a", "+{oops").unwrap_err();
        assert_eq!(err, ExpandError::Unterminated { site: "a".into() });
    }

    #[test]
    fn output_is_minified() {
        let mut set = MacroSet::new();
        set.register("step", "  > +  (advance and mark)\n").unwrap();
        set.register("main", "{step} {step}").unwrap();
        let out = set.expand("main").unwrap();
        assert!(out.chars().all(|c| "+-<>[],.".contains(c)));
        assert_eq!(out, ">+>+");
    }
}
