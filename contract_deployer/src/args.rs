use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use ethers::{
    abi::{
        token::{LenientTokenizer, Tokenizer},
        Constructor, Param, ParamType, Token,
    },
    types::Address,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stands for the deployer's own address wherever an argument string is accepted.
pub const DEPLOYER_PLACEHOLDER: &str = "$deployer";

/// Where a constructor argument comes from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgSource {
    /// `{ env = "COMMUNITY_TREASURY", default = "$deployer" }`
    Env {
        env: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<String>,
    },
    /// `{ contract = "HarlemNFT" }`, a contract deployed earlier in the same run
    Deployed { contract: String },
    Literal(Value),
}

pub struct ArgContext<'a> {
    pub deployer: Address,
    pub deployed: &'a HashMap<String, Address>,
    pub lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl ArgContext<'_> {
    fn expand(&self, raw: &str) -> String {
        if raw == DEPLOYER_PLACEHOLDER {
            format!("{:?}", self.deployer)
        } else {
            raw.to_owned()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedArg {
    pub name: String,
    pub raw: String,
    pub token: Token,
}

impl ArgSource {
    /// Resolves to the string form fed to the tokenizer.
    pub fn resolve_raw(&self, param: &ParamType, ctx: &ArgContext) -> Result<String> {
        match self {
            ArgSource::Env { env, default } => {
                if let Some(value) = (ctx.lookup)(env).filter(|v| !v.trim().is_empty()) {
                    return Ok(ctx.expand(value.trim()));
                }
                match default {
                    Some(default) => Ok(ctx.expand(default)),
                    // address overrides fall back to the deployer itself
                    None if *param == ParamType::Address => Ok(format!("{:?}", ctx.deployer)),
                    None => Err(anyhow!("{env} is not set and has no default")),
                }
            }
            ArgSource::Deployed { contract } => ctx
                .deployed
                .get(contract)
                .map(|address| format!("{address:?}"))
                .ok_or_else(|| anyhow!("{contract} has not been deployed earlier in this run")),
            ArgSource::Literal(value) => literal_to_raw(value, ctx),
        }
    }
}

fn literal_to_raw(value: &Value, ctx: &ArgContext) -> Result<String> {
    match value {
        Value::String(s) => Ok(ctx.expand(s)),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Array(items) => {
            let items = items
                .iter()
                .map(|item| literal_to_raw(item, ctx))
                .collect::<Result<Vec<_>>>()?;
            Ok(format!("[{}]", items.join(",")))
        }
        Value::Null | Value::Object(_) => Err(anyhow!("unsupported argument value: {value}")),
    }
}

pub fn tokenize(param: &ParamType, raw: &str) -> Result<Token> {
    let raw = match param {
        ParamType::Address | ParamType::Bytes | ParamType::FixedBytes(_) => {
            raw.trim_start_matches("0x")
        }
        _ => raw,
    };
    LenientTokenizer::tokenize(param, raw)
        .map_err(|e| anyhow!("cannot encode `{raw}` as {param}: {e}"))
}

/// Resolves and encodes every constructor argument, in order.
pub fn resolve_constructor_args(
    constructor: Option<&Constructor>,
    sources: &[ArgSource],
    ctx: &ArgContext,
) -> Result<Vec<ResolvedArg>> {
    let inputs: &[Param] = constructor.map(|c| c.inputs.as_slice()).unwrap_or_default();
    if inputs.len() != sources.len() {
        return Err(anyhow!(
            "constructor takes {} argument(s) but {} were configured",
            inputs.len(),
            sources.len()
        ));
    }

    inputs
        .iter()
        .zip(sources)
        .enumerate()
        .map(|(i, (param, source))| {
            let name = if param.name.is_empty() {
                format!("arg{i}")
            } else {
                param.name.clone()
            };
            let raw = source
                .resolve_raw(&param.kind, ctx)
                .with_context(|| format!("constructor argument `{name}`"))?;
            let token =
                tokenize(&param.kind, &raw).with_context(|| format!("constructor argument `{name}`"))?;
            Ok(ResolvedArg { name, raw, token })
        })
        .collect()
}
