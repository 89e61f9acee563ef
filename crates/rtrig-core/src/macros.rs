//! Token macro expansion of outgoing values.
//!
//! Expansion only happens when an expander is installed and the call
//! context names a run and a workspace; otherwise values go out verbatim.

use std::collections::HashMap;

use crate::context::CallContext;
use crate::error::TriggerError;
use crate::form::{PostParams, PostValue};

/// Expands macros such as `${NAME}` in a string.
pub trait MacroExpander: Send + Sync {
    fn expand(&self, input: &str, ctx: &CallContext) -> Result<String, TriggerError>;
}

fn use_macros(ctx: &CallContext) -> bool {
    ctx.run_id.is_some() && ctx.workspace.is_some()
}

/// Expand `input` when an expander applies to this call, else return it unchanged.
pub fn apply_macro_replacements(
    expander: Option<&dyn MacroExpander>,
    ctx: &CallContext,
    input: &str,
) -> Result<String, TriggerError> {
    match expander {
        Some(expander) if use_macros(ctx) => expander.expand(input, ctx),
        _ => Ok(input.to_string()),
    }
}

/// Expand every text value of `params`. File values pass through untouched.
pub fn apply_macro_replacements_to_params(
    expander: Option<&dyn MacroExpander>,
    ctx: &CallContext,
    params: &PostParams,
) -> Result<PostParams, TriggerError> {
    params
        .iter()
        .map(|(key, value)| {
            let value = match value {
                PostValue::Text(text) => {
                    PostValue::Text(apply_macro_replacements(expander, ctx, text)?)
                }
                file => file.clone(),
            };
            Ok((key.clone(), value))
        })
        .collect()
}

/// `${NAME}` substitution from a fixed variable table.
///
/// `RUN_ID` and `WORKSPACE` resolve from the call context. Unknown names are
/// an error; `$$` is a literal `$`.
#[derive(Debug, Clone, Default)]
pub struct VariableExpander {
    vars: HashMap<String, String>,
}

impl VariableExpander {
    pub fn new(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }

    /// Table populated from the process environment.
    pub fn from_env() -> Self {
        Self::new(std::env::vars().collect())
    }

    fn lookup(&self, name: &str, ctx: &CallContext) -> Option<String> {
        match name {
            "RUN_ID" => ctx.run_id.clone(),
            "WORKSPACE" => ctx
                .workspace
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            _ => self.vars.get(name).cloned(),
        }
    }
}

impl MacroExpander for VariableExpander {
    fn expand(&self, input: &str, ctx: &CallContext) -> Result<String, TriggerError> {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos + 1..];
            if let Some(after) = tail.strip_prefix('$') {
                out.push('$');
                rest = after;
            } else if let Some(body) = tail.strip_prefix('{') {
                let end = body.find('}').ok_or_else(|| {
                    TriggerError::Configuration(format!("unterminated macro in {input:?}"))
                })?;
                let name = &body[..end];
                let value = self.lookup(name, ctx).ok_or_else(|| {
                    TriggerError::Configuration(format!("unknown macro ${{{name}}}"))
                })?;
                out.push_str(&value);
                rest = &body[end + 1..];
            } else {
                out.push('$');
                rest = tail;
            }
        }
        out.push_str(rest);
        Ok(out)
    }
}
