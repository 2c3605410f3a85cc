//! Word Expansion Orchestrator
//!
//! Ties together the expansion primitives in `expansion/*` into the full
//! bash expansion pipeline: brace expansion, tilde expansion, parameter
//! expansion, command/arithmetic substitution, IFS word splitting and
//! pathname (glob) expansion, in that order.

use crate::ast::types::{
    ArrayKeysOp, BraceItem, CaseDirection, CommandSubstitutionPart, DoubleQuotedPart,
    InnerParameterOperation, LiteralPart, ParameterExpansionPart, ParameterOperation,
    PatternAnchor, PatternRemovalSide, ProcessDirection, ScriptNode, TransformOperator, WordNode,
    WordPart,
};
use crate::interpreter::arithmetic::evaluate_arithmetic;
use crate::interpreter::expansion::brace_range::{expand_brace_range, RangeValue};
use crate::interpreter::expansion::glob_escape::has_glob_pattern;
use crate::interpreter::expansion::indirect_expansion::expand_indirect_array;
use crate::interpreter::expansion::pattern::pattern_to_regex;
use crate::interpreter::expansion::pattern_expansion::expand_variables_in_pattern;
use crate::interpreter::expansion::pattern_removal::{apply_pattern_removal, get_var_names_with_prefix};
use crate::interpreter::expansion::tilde::apply_tilde_expansion;
use crate::interpreter::expansion::variable::{get_array_elements, get_variable, is_variable_set};
use crate::interpreter::expansion::word_split::{
    is_part_splittable, smart_word_split, WordSplitSegment,
};
use crate::interpreter::expansion::parameter_ops::{
    apply_case_modification, apply_substring_op, apply_transform_op, get_array_keys,
    get_parameter_length, get_var_names_with_prefix_op, should_use_alternative,
    should_use_default, ParameterOpContext,
};
use crate::interpreter::helpers::get_ifs;
use crate::interpreter::interpreter::FileSystem as SyncFileSystem;
use crate::interpreter::types::{ExecResult, ExecutionLimits, InterpreterContext, InterpreterState};

/// Callback used to run a nested script for command/process substitution.
/// Supplied by the execution engine so this module stays decoupled from it.
pub type RunScript<'a> = dyn FnMut(&ScriptNode, &mut InterpreterState) -> ExecResult + 'a;

pub struct Expander<'a> {
    pub fs: &'a dyn SyncFileSystem,
    pub limits: &'a ExecutionLimits,
}

/// The result of expanding a single top-level word part, tagged with
/// quoting/splittability metadata needed for IFS word splitting, plus
/// an optional set of *extra words* this part expands to on its own
/// (used by unquoted "$@" / array[@]).
struct PartExpansion {
    value: String,
    is_quoted: bool,
    is_splittable: bool,
    extra_words: Option<Vec<String>>,
}

impl<'a> Expander<'a> {
    pub fn new(fs: &'a dyn SyncFileSystem, limits: &'a ExecutionLimits) -> Self {
        Self { fs, limits }
    }

    /// Expand a word to a single string with no splitting and no globbing.
    /// Used for command names, assignment values, case subjects, redirection
    /// targets, and anywhere else bash treats the word as if double-quoted.
    pub fn expand_plain(&self, state: &mut InterpreterState, word: &WordNode, run: &mut RunScript) -> String {
        word.parts
            .iter()
            .map(|p| self.expand_part(state, p, true, run).value)
            .collect()
    }

    /// Full expansion of a single word into zero or more argument words:
    /// brace expansion, then for each resulting branch, parameter/command/
    /// arithmetic expansion, IFS splitting, and pathname expansion.
    pub fn expand_word_full(&self, state: &mut InterpreterState, word: &WordNode, run: &mut RunScript) -> Vec<String> {
        let mut out = Vec::new();
        for branch in Self::brace_expand(word) {
            out.extend(self.expand_one_no_brace(state, &branch, run));
        }
        out
    }

    /// Expand a whole word list (e.g. command args, `for` word list).
    pub fn expand_words_full(&self, state: &mut InterpreterState, words: &[WordNode], run: &mut RunScript) -> Vec<String> {
        let mut out = Vec::new();
        for w in words {
            out.extend(self.expand_word_full(state, w, run));
        }
        out
    }

    // ------------------------------------------------------------------
    // Brace expansion
    // ------------------------------------------------------------------

    /// Expand `{a,b,c}` / `{1..5}` brace groups into multiple literal-ish
    /// words. Brace expansion is purely syntactic and runs before any other
    /// expansion, so the resulting words may still contain unexpanded parts.
    fn brace_expand(word: &WordNode) -> Vec<WordNode> {
        let idx = word
            .parts
            .iter()
            .position(|p| matches!(p, WordPart::BraceExpansion(_)));

        let Some(idx) = idx else {
            return vec![word.clone()];
        };

        let items: &[BraceItem] = match &word.parts[idx] {
            WordPart::BraceExpansion(b) => &b.items,
            _ => unreachable!(),
        };

        let mut alternatives: Vec<Vec<WordPart>> = Vec::new();
        for item in items {
            match item {
                BraceItem::Word { word: w } => alternatives.push(w.parts.clone()),
                BraceItem::Range {
                    start,
                    end,
                    step,
                    start_str,
                    end_str,
                } => {
                    let (rs, re) = match (start, end) {
                        (crate::ast::types::BraceRangeValue::Number(s), crate::ast::types::BraceRangeValue::Number(e)) => {
                            (RangeValue::Numeric(*s), RangeValue::Numeric(*e))
                        }
                        (crate::ast::types::BraceRangeValue::Char(s), crate::ast::types::BraceRangeValue::Char(e)) => {
                            (RangeValue::Char(*s), RangeValue::Char(*e))
                        }
                        _ => (RangeValue::Numeric(0), RangeValue::Numeric(0)),
                    };
                    match expand_brace_range(rs, re, *step, start_str.as_deref(), end_str.as_deref()) {
                        Ok(result) => match result.expanded {
                            Some(values) => {
                                for v in values {
                                    alternatives.push(vec![WordPart::Literal(LiteralPart { value: v })]);
                                }
                            }
                            None => alternatives.push(vec![WordPart::Literal(LiteralPart { value: result.literal })]),
                        },
                        Err(e) => alternatives.push(vec![WordPart::Literal(LiteralPart { value: e.to_string() })]),
                    }
                }
            }
        }

        let mut out = Vec::new();
        for alt in alternatives {
            let mut parts = word.parts[..idx].to_vec();
            parts.extend(alt);
            parts.extend(word.parts[idx + 1..].to_vec());
            let branch = WordNode { parts };
            // Recurse in case there's another brace group left (e.g. a{b,c}{d,e}).
            out.extend(Self::brace_expand(&branch));
        }
        out
    }

    // ------------------------------------------------------------------
    // Per-word expansion (after brace expansion)
    // ------------------------------------------------------------------

    fn expand_one_no_brace(&self, state: &mut InterpreterState, word: &WordNode, run: &mut RunScript) -> Vec<String> {
        // Fully-quoted single-part words never split or glob, even if empty.
        if word.parts.len() == 1 {
            if let WordPart::DoubleQuoted(_) | WordPart::SingleQuoted(_) = &word.parts[0] {
                let expansion = self.expand_part(state, &word.parts[0], false, run);
                if let Some(words) = expansion.extra_words {
                    return words;
                }
                return vec![expansion.value];
            }
        }

        let mut segments: Vec<WordSplitSegment> = Vec::new();
        let mut forced_words: Option<Vec<String>> = None;
        let has_glob_part = word.parts.iter().any(|p| matches!(p, WordPart::Glob(_)));

        for part in &word.parts {
            let exp = self.expand_part(state, part, false, run);
            if let Some(extra) = exp.extra_words {
                // An unquoted "$@"-like part: bash splices each element in as
                // its own word, joining the first/last with neighboring text.
                if segments.is_empty() && forced_words.is_none() {
                    forced_words = Some(extra);
                } else {
                    // Mid-word array splice: approximate by flattening.
                    let prefix: String = segments.iter().map(|s| s.value.as_str()).collect();
                    let mut words = vec![format!("{}{}", prefix, extra.first().cloned().unwrap_or_default())];
                    words.extend(extra.into_iter().skip(1));
                    forced_words = Some(words);
                    segments.clear();
                }
                continue;
            }
            segments.push(WordSplitSegment {
                value: exp.value,
                is_splittable: exp.is_splittable && is_part_splittable(part),
                is_quoted: exp.is_quoted,
            });
        }

        let ifs = get_ifs(&state.env).to_string();
        let mut words = if let Some(forced) = forced_words {
            if segments.is_empty() {
                forced
            } else {
                let tail: String = segments.iter().map(|s| s.value.as_str()).collect();
                let mut w = forced;
                if let Some(last) = w.last_mut() {
                    last.push_str(&tail);
                } else {
                    w.push(tail);
                }
                w
            }
        } else {
            smart_word_split(&segments, &ifs).words
        };

        if has_glob_part && !state.options.noglob {
            words = words
                .into_iter()
                .flat_map(|w| self.maybe_glob_expand(state, &w))
                .collect();
        }

        words
    }

    fn maybe_glob_expand(&self, state: &InterpreterState, pattern: &str) -> Vec<String> {
        if !has_glob_pattern(pattern, state.shopt_options.extglob) {
            return vec![pattern.to_string()];
        }
        match self.fs.glob(pattern, &state.cwd) {
            Ok(mut matches) if !matches.is_empty() => {
                matches.sort();
                matches
            }
            _ => {
                if state.shopt_options.nullglob {
                    vec![]
                } else {
                    vec![pattern.to_string()]
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Single-part expansion
    // ------------------------------------------------------------------

    fn expand_part(&self, state: &mut InterpreterState, part: &WordPart, in_quotes: bool, run: &mut RunScript) -> PartExpansion {
        match part {
            WordPart::Literal(l) => PartExpansion {
                value: l.value.clone(),
                is_quoted: in_quotes,
                is_splittable: false,
                extra_words: None,
            },
            WordPart::SingleQuoted(sq) => PartExpansion {
                value: sq.value.clone(),
                is_quoted: true,
                is_splittable: false,
                extra_words: None,
            },
            WordPart::Escaped(e) => PartExpansion {
                value: e.value.clone(),
                is_quoted: in_quotes,
                is_splittable: false,
                extra_words: None,
            },
            WordPart::DoubleQuoted(dq) => self.expand_double_quoted(state, dq, run),
            WordPart::TildeExpansion(t) => {
                let v = if let Some(ref user) = t.user {
                    apply_tilde_expansion(state, &format!("~{}", user))
                } else {
                    apply_tilde_expansion(state, "~")
                };
                PartExpansion { value: v, is_quoted: in_quotes, is_splittable: false, extra_words: None }
            }
            WordPart::ParameterExpansion(pe) => self.expand_parameter(state, pe, in_quotes, run),
            WordPart::CommandSubstitution(cs) => {
                let value = self.run_command_substitution(state, cs, run);
                PartExpansion { value, is_quoted: in_quotes, is_splittable: !in_quotes, extra_words: None }
            }
            WordPart::ArithmeticExpansion(ae) => {
                let mut ctx = InterpreterContext::new(state, self.limits);
                let value = match evaluate_arithmetic(&mut ctx, &ae.expression.expression, false, None) {
                    Ok(v) => v.to_string(),
                    Err(e) => {
                        ctx.state.last_exit_code = 1;
                        let _ = e;
                        String::new()
                    }
                };
                PartExpansion { value, is_quoted: in_quotes, is_splittable: !in_quotes, extra_words: None }
            }
            WordPart::ProcessSubstitution(ps) => {
                let path = self.run_process_substitution(state, ps, run);
                PartExpansion { value: path, is_quoted: true, is_splittable: false, extra_words: None }
            }
            WordPart::Glob(g) => {
                let expanded = expand_variables_in_pattern(state, &g.pattern);
                PartExpansion { value: expanded, is_quoted: in_quotes, is_splittable: false, extra_words: None }
            }
            WordPart::BraceExpansion(_) => {
                // Already resolved in brace_expand(); reaching here means a
                // nested brace group we didn't flatten (rare). Best effort.
                PartExpansion { value: String::new(), is_quoted: in_quotes, is_splittable: false, extra_words: None }
            }
        }
    }

    fn expand_double_quoted(&self, state: &mut InterpreterState, dq: &DoubleQuotedPart, run: &mut RunScript) -> PartExpansion {
        // "$@" / "${arr[@]}" inside double quotes splice as separate, fully
        // quoted words (each element untouched by further splitting).
        if dq.parts.len() == 1 {
            if let WordPart::ParameterExpansion(pe) = &dq.parts[0] {
                if pe.operation.is_none() {
                    if pe.parameter == "@" {
                        let argc: usize = state.env.get("#").and_then(|s| s.parse().ok()).unwrap_or(0);
                        let words: Vec<String> = (1..=argc)
                            .map(|i| state.env.get(&i.to_string()).cloned().unwrap_or_default())
                            .collect();
                        return PartExpansion { value: String::new(), is_quoted: true, is_splittable: false, extra_words: Some(words) };
                    }
                    if let Some(array_name) = pe.parameter.strip_suffix("[@]") {
                        let elements = get_array_elements(state, array_name);
                        if !elements.is_empty() || crate::interpreter::expansion::variable::is_array(state, array_name) {
                            let words: Vec<String> = elements.into_iter().map(|(_, v)| v).collect();
                            return PartExpansion { value: String::new(), is_quoted: true, is_splittable: false, extra_words: Some(words) };
                        }
                    }
                }
            }
        }

        let value: String = dq.parts.iter().map(|p| self.expand_part(state, p, true, run).value).collect();
        PartExpansion { value, is_quoted: true, is_splittable: false, extra_words: None }
    }

    // ------------------------------------------------------------------
    // Command / process substitution
    // ------------------------------------------------------------------

    fn run_command_substitution(&self, state: &mut InterpreterState, cs: &CommandSubstitutionPart, run: &mut RunScript) -> String {
        let result = run(&cs.body, state);
        let mut out = result.stdout;
        while out.ends_with('\n') {
            out.pop();
        }
        out
    }

    fn run_process_substitution(&self, state: &mut InterpreterState, ps: &crate::ast::types::ProcessSubstitutionPart, run: &mut RunScript) -> String {
        // Modeled as a VFS-backed named pipe: for `<(...)` we eagerly run the
        // body and stash its stdout at a synthetic path; for `>(...)` we
        // allocate the path and run the body with the eventual writer's
        // content unavailable synchronously, so it simply executes with
        // empty stdin for its side effects.
        use std::sync::atomic::{AtomicUsize, Ordering};
        static PROCSUB_COUNTER: AtomicUsize = AtomicUsize::new(0);
        let fd = PROCSUB_COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = format!("/dev/fd/procsub{}", fd);
        match ps.direction {
            ProcessDirection::Input => {
                let result = run(&ps.body, state);
                let _ = self.fs.write_file(&path, &result.stdout);
            }
            ProcessDirection::Output => {
                let _ = self.fs.write_file(&path, "");
                let _ = run(&ps.body, state);
            }
        }
        path
    }

    // ------------------------------------------------------------------
    // Parameter expansion
    // ------------------------------------------------------------------

    fn expand_parameter(&self, state: &mut InterpreterState, pe: &ParameterExpansionPart, in_quotes: bool, run: &mut RunScript) -> PartExpansion {
        // Unquoted "$@" / "array[@]" / "array[*]" multi-word expansion.
        if !in_quotes && pe.operation.is_none() {
            if pe.parameter == "@" || pe.parameter == "*" {
                let argc: usize = state.env.get("#").and_then(|s| s.parse().ok()).unwrap_or(0);
                let words: Vec<String> = (1..=argc)
                    .map(|i| state.env.get(&i.to_string()).cloned().unwrap_or_default())
                    .collect();
                if pe.parameter == "*" {
                    return PartExpansion { value: words.join(" "), is_quoted: false, is_splittable: true, extra_words: None };
                }
                return PartExpansion { value: String::new(), is_quoted: false, is_splittable: false, extra_words: Some(words) };
            }
            if let Some(array_name) = pe.parameter.strip_suffix("[@]") {
                let elements = get_array_elements(state, array_name);
                let words: Vec<String> = elements.into_iter().map(|(_, v)| v).collect();
                return PartExpansion { value: String::new(), is_quoted: false, is_splittable: false, extra_words: Some(words) };
            }
            if let Some(array_name) = pe.parameter.strip_suffix("[*]") {
                let elements = get_array_elements(state, array_name);
                let values: Vec<String> = elements.into_iter().map(|(_, v)| v).collect();
                return PartExpansion { value: values.join(" "), is_quoted: false, is_splittable: true, extra_words: None };
            }
        }

        let Some(op) = &pe.operation else {
            let value = get_variable(state, &pe.parameter);
            return PartExpansion { value, is_quoted: in_quotes, is_splittable: !in_quotes, extra_words: None };
        };

        let value = self.expand_operation(state, &pe.parameter, op, in_quotes, run);
        PartExpansion { value, is_quoted: in_quotes, is_splittable: !in_quotes, extra_words: None }
    }

    fn expand_operation(&self, state: &mut InterpreterState, parameter: &str, op: &ParameterOperation, in_quotes: bool, run: &mut RunScript) -> String {
        match op {
            ParameterOperation::Indirection(ind) => {
                // ${!name} - name's value is itself a variable name to look up.
                let target = get_variable(state, parameter);
                if let Some(inner) = &ind.inner_op {
                    return self.expand_operation(state, &target, &ParameterOperation::Inner((**inner).clone()), in_quotes, run);
                }
                if let Some(result) = expand_indirect_array(state, parameter) {
                    return result.values.join(" ");
                }
                get_variable(state, &target)
            }
            ParameterOperation::ArrayKeys(ArrayKeysOp { array, star }) => {
                get_array_keys(state, array, *star).join(" ")
            }
            ParameterOperation::VarNamePrefix(p) => {
                get_var_names_with_prefix_op(state, &p.prefix, p.star).join(" ")
            }
            ParameterOperation::Inner(inner) => self.expand_inner_operation(state, parameter, inner, in_quotes, run),
        }
    }

    fn expand_inner_operation(&self, state: &mut InterpreterState, parameter: &str, inner: &InnerParameterOperation, in_quotes: bool, run: &mut RunScript) -> String {
        match inner {
            InnerParameterOperation::Length(_) => get_parameter_length(state, parameter).to_string(),
            InnerParameterOperation::LengthSliceError(_) | InnerParameterOperation::BadSubstitution(_) => {
                state.last_exit_code = 1;
                String::new()
            }
            InnerParameterOperation::DefaultValue(dv) => {
                let ctx = ParameterOpContext::new(state, parameter, in_quotes);
                if should_use_default(&ctx, dv.check_empty) {
                    self.expand_plain(state, &dv.word, run)
                } else {
                    ctx.value
                }
            }
            InnerParameterOperation::AssignDefault(ad) => {
                let ctx = ParameterOpContext::new(state, parameter, in_quotes);
                if should_use_default(&ctx, ad.check_empty) {
                    let v = self.expand_plain(state, &ad.word, run);
                    state.env.insert(parameter.to_string(), v.clone());
                    v
                } else {
                    ctx.value
                }
            }
            InnerParameterOperation::ErrorIfUnset(eiu) => {
                let ctx = ParameterOpContext::new(state, parameter, in_quotes);
                if should_use_default(&ctx, eiu.check_empty) {
                    let msg = match &eiu.word {
                        Some(w) => self.expand_plain(state, w, run),
                        None => "parameter null or not set".to_string(),
                    };
                    state.last_exit_code = 1;
                    format!("bash: {}: {}\n", parameter, msg)
                } else {
                    ctx.value
                }
            }
            InnerParameterOperation::UseAlternative(ua) => {
                let ctx = ParameterOpContext::new(state, parameter, in_quotes);
                if should_use_alternative(&ctx, ua.check_empty) {
                    self.expand_plain(state, &ua.word, run)
                } else {
                    String::new()
                }
            }
            InnerParameterOperation::Substring(sub) => {
                let value = get_variable(state, parameter);
                let mut ctx = InterpreterContext::new(state, self.limits);
                let offset = evaluate_arithmetic(&mut ctx, &sub.offset.expression, false, None).unwrap_or(0);
                let length = sub
                    .length
                    .as_ref()
                    .and_then(|l| evaluate_arithmetic(&mut ctx, &l.expression, false, None).ok());
                apply_substring_op(&value, offset, length).unwrap_or_default()
            }
            InnerParameterOperation::PatternRemoval(pr) => {
                let value = get_variable(state, parameter);
                let pattern_text = self.expand_plain(state, &pr.pattern, run);
                let regex = pattern_to_regex(&pattern_text, pr.greedy, state.shopt_options.extglob);
                let side = match pr.side {
                    PatternRemovalSide::Prefix => crate::interpreter::expansion::pattern_removal::PatternRemovalSide::Prefix,
                    PatternRemovalSide::Suffix => crate::interpreter::expansion::pattern_removal::PatternRemovalSide::Suffix,
                };
                apply_pattern_removal(&value, &regex, side, pr.greedy)
            }
            InnerParameterOperation::PatternReplacement(pr) => {
                let value = get_variable(state, parameter);
                let pattern_text = self.expand_plain(state, &pr.pattern, run);
                let replacement = pr.replacement.as_ref().map(|w| self.expand_plain(state, w, run)).unwrap_or_default();
                let regex = pattern_to_regex(&pattern_text, pr.all, state.shopt_options.extglob);
                let anchor_start = matches!(pr.anchor, Some(PatternAnchor::Start));
                let anchor_end = matches!(pr.anchor, Some(PatternAnchor::End));
                crate::interpreter::expansion::parameter_ops::apply_pattern_replacement_op(
                    &value, &regex, &replacement, pr.all, anchor_start, anchor_end,
                )
            }
            InnerParameterOperation::CaseModification(cm) => {
                let value = get_variable(state, parameter);
                let op_char = match (cm.direction, cm.all) {
                    (CaseDirection::Upper, true) => "U",
                    (CaseDirection::Upper, false) => "u",
                    (CaseDirection::Lower, true) => "L",
                    (CaseDirection::Lower, false) => "l",
                };
                apply_case_modification(&value, op_char)
            }
            InnerParameterOperation::Transform(t) => {
                let value = get_variable(state, parameter);
                let op_char = match t.operator {
                    TransformOperator::Q => "Q",
                    TransformOperator::P => "P",
                    TransformOperator::A => "a",
                    TransformOperator::LowerA => "a",
                    TransformOperator::LowerU => "u",
                    TransformOperator::U => "U",
                    TransformOperator::L => "L",
                    _ => "",
                };
                apply_transform_op(state, parameter, &value, op_char)
            }
        }
    }
}

/// Whether a parameter is currently set (used outside this module by callers
/// that only need the boolean, e.g. `[[ -v ]]`).
pub fn parameter_is_set(state: &InterpreterState, name: &str) -> bool {
    is_variable_set(state, name)
}

/// Names-with-prefix helper re-exported for builtins that need it directly.
pub fn var_names_with_prefix(state: &InterpreterState, prefix: &str) -> Vec<String> {
    get_var_names_with_prefix(state, prefix)
}
