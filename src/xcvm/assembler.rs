//! Text form of XCVM programs.
//!
//! Source is compiled through [`crate::xcvm::compose`], so every operand is
//! kind-checked exactly as a programmatic caller's would be.
//!
//! # Syntax
//!
//! ```text
//! # comment
//! TRANSFER account:0x0a0b asset:1=100 asset:2=1/2
//! CALL 0x00112233445566778899 @4=amount:1=1/2 @8=result:0
//! QUERY 0xdead
//! SPAWN network:2 salt:0x01 security:deterministic asset:1=3+1/2 {
//!     TRANSFER relayer asset:1=1/1
//! }
//! ```
//!
//! - One instruction per line, mnemonics are uppercase
//! - Balances are `N` (absolute), `N/D` (ratio) or `I+N/D` (unit)
//! - Binding values are `self`, `relayer`, `asset-id:<id>`,
//!   `amount:<id>=N/D` and `result:<i>`
//! - A `SPAWN` line ends with `{`; its program runs until the matching `}`

use crate::config::CodecLimits;
use crate::types::bytes::Bytes;
use crate::xcvm::compose::{self, Node};
use crate::xcvm::errors::{BindingFault, XcvmError};
use crate::xcvm::instruction::{Destination, Instruction};
use crate::xcvm::network::{BridgeSecurity, Network, Salt};
use crate::xcvm::program::Program;
use crate::xcvm::value::{Absolute, Account, AssetId, Ratio};
use std::fmt::Write;
use std::fs;
use std::path::Path;

const COMMENT_CHAR: char = '#';
const BLOCK_OPEN: &str = "{";
const BLOCK_CLOSE: &str = "}";
const INDENT: &str = "    ";

/// A non-empty source line, split into whitespace-separated tokens.
#[derive(Debug)]
struct SourceLine<'a> {
    /// 1-based line number.
    number: usize,
    tokens: Vec<&'a str>,
}

/// Strips comments and blank lines.
fn tokenize(source: &str) -> Vec<SourceLine<'_>> {
    source
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let code = line.split(COMMENT_CHAR).next().unwrap_or("");
            let tokens: Vec<&str> = code.split_whitespace().collect();
            (!tokens.is_empty()).then_some(SourceLine {
                number: index + 1,
                tokens,
            })
        })
        .collect()
}

fn parse_num<T: std::str::FromStr>(text: &str, what: &str) -> Result<T, String> {
    text.parse::<T>()
        .map_err(|_| format!("invalid {what} `{text}`"))
}

fn parse_hex(text: &str) -> Result<Bytes, String> {
    if !text.starts_with("0x") {
        return Err(format!("expected 0x-prefixed bytes, got `{text}`"));
    }
    Bytes::from_hex(text).ok_or_else(|| format!("invalid hex `{text}`"))
}

fn parse_ratio(text: &str) -> Result<Node, String> {
    let (numerator, denominator) = text
        .split_once('/')
        .ok_or_else(|| format!("expected N/D, got `{text}`"))?;
    let ratio = Ratio::new(
        parse_num(numerator, "numerator")?,
        parse_num(denominator, "denominator")?,
    )
    .map_err(|e| e.to_string())?;
    Ok(Node::Ratio(ratio))
}

/// `N`, `N/D` or `I+N/D`.
fn parse_quantity(text: &str) -> Result<Node, String> {
    if let Some((integer, ratio)) = text.split_once('+') {
        let unit = compose::compose_unit(parse_num(integer, "integer")?, parse_ratio(ratio)?)
            .map_err(|e| e.to_string())?;
        Ok(Node::Unit(unit))
    } else if text.contains('/') {
        parse_ratio(text)
    } else {
        Ok(Node::Absolute(Absolute::new(parse_num(text, "amount")?)))
    }
}

fn parse_asset_id(text: &str) -> Result<Node, String> {
    Ok(Node::AssetId(AssetId::new(parse_num(text, "asset id")?)))
}

/// Parses one operand into a node of the kind its syntax names.
fn parse_operand(token: &str) -> Result<Node, String> {
    let compose_err = |e: XcvmError| e.to_string();

    match token {
        "relayer" => return Ok(Node::Relayer),
        "self" => return Ok(Node::SelfAccount),
        _ => {}
    }

    if token.starts_with("0x") {
        return Ok(Node::Bytes(parse_hex(token)?));
    }

    if let Some(rest) = token.strip_prefix('@') {
        let (position, value) = rest
            .split_once('=')
            .ok_or_else(|| format!("expected @<position>=<value>, got `{token}`"))?;
        let value = compose::compose_binding_value(parse_operand(value)?).map_err(compose_err)?;
        let binding = compose::compose_binding(parse_num(position, "binding position")?, value.into())
            .map_err(compose_err)?;
        return Ok(Node::Binding(binding));
    }

    let (kind, body) = token
        .split_once(':')
        .ok_or_else(|| format!("unknown operand `{token}`"))?;

    match kind {
        "account" => Ok(Node::Account(Account::new(parse_hex(body)?))),
        "asset" => {
            let (id, quantity) = body
                .split_once('=')
                .ok_or_else(|| format!("expected asset:<id>=<balance>, got `{token}`"))?;
            let balance = compose::compose_balance(parse_quantity(quantity)?).map_err(compose_err)?;
            let asset = compose::compose_asset(parse_asset_id(id)?, balance.into()).map_err(compose_err)?;
            Ok(Node::Asset(asset))
        }
        "asset-id" => parse_asset_id(body),
        "amount" => {
            let (id, ratio) = body
                .split_once('=')
                .ok_or_else(|| format!("expected amount:<id>=N/D, got `{token}`"))?;
            let amount =
                compose::compose_asset_amount(parse_asset_id(id)?, parse_ratio(ratio)?).map_err(compose_err)?;
            Ok(Node::AssetAmount(amount))
        }
        "result" => Ok(Node::Result(parse_num(body, "result index")?)),
        "network" => Ok(Node::Network(Network::new(parse_num(body, "network id")?))),
        "salt" => Ok(Node::Salt(Salt::new(parse_hex(body)?))),
        "security" => BridgeSecurity::from_name(body)
            .map(Node::BridgeSecurity)
            .ok_or_else(|| format!("unknown bridge security `{body}`")),
        _ => Err(format!("unknown operand kind `{kind}`")),
    }
}

fn parse_operands(tokens: &[&str]) -> Result<Vec<Node>, String> {
    tokens.iter().map(|t| parse_operand(t)).collect()
}

/// Recursive descent over source lines, one call per program block.
///
/// `depth` counts the `SPAWN` blocks currently open; opening one past
/// `max_depth` is an error, which also bounds the recursion.
struct Parser<'a> {
    lines: Vec<SourceLine<'a>>,
    next: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    fn error(line: usize, message: impl Into<String>) -> XcvmError {
        XcvmError::Assembly {
            line,
            message: message.into(),
        }
    }

    /// Parses instructions up to the closing `}` of the block opened on
    /// `opened_at`, or to the end of input for the top-level program.
    fn program(&mut self, opened_at: Option<usize>) -> Result<Program, XcvmError> {
        let mut nodes = Vec::new();
        let mut numbers = Vec::new();

        loop {
            let Some(line) = self.lines.get(self.next) else {
                if let Some(open) = opened_at {
                    return Err(Self::error(open, "unclosed `{`"));
                }
                break;
            };
            let number = line.number;
            self.next += 1;

            if line.tokens == [BLOCK_CLOSE] {
                if opened_at.is_none() {
                    return Err(Self::error(number, "unmatched `}`"));
                }
                break;
            }

            let tokens = line.tokens.clone();
            let instruction = self
                .instruction(number, &tokens)
                .and_then(compose::compose_instruction)
                .map_err(|e| match e {
                    XcvmError::Assembly { .. } => e,
                    other => Self::error(number, other.to_string()),
                })?;
            nodes.push(Node::Instruction(instruction));
            numbers.push(number);
        }

        let block_line = opened_at.unwrap_or(1);
        let instructions = compose::compose_instructions(nodes).map_err(|e| {
            let line = match &e {
                XcvmError::InvalidBindingPosition {
                    reason: BindingFault::ForwardResult { index, .. },
                    ..
                } => numbers.get(*index).copied().unwrap_or(block_line),
                _ => block_line,
            };
            Self::error(line, e.to_string())
        })?;
        compose::compose_program(instructions.into())
    }

    fn instruction(&mut self, number: usize, tokens: &[&str]) -> Result<Node, XcvmError> {
        let operands = |from: usize| parse_operands(&tokens[from..]).map_err(|m| Self::error(number, m));
        let arity = |count: usize, usage: &str| {
            if tokens.len() < count + 1 {
                Err(Self::error(number, format!("usage: {usage}")))
            } else {
                Ok(())
            }
        };

        match tokens[0] {
            "TRANSFER" => {
                arity(2, "TRANSFER <account|relayer> <asset>...")?;
                let mut operands = operands(1)?;
                let destination = operands.remove(0);
                Ok(compose::compose_transfer(destination, operands)?.into())
            }
            "CALL" => {
                arity(1, "CALL <payload> [@<position>=<value>]...")?;
                let mut operands = operands(1)?;
                let payload = operands.remove(0);
                let bindings = compose::compose_bindings(operands)?;
                Ok(compose::compose_call(payload, bindings.into())?.into())
            }
            "QUERY" => {
                if tokens.len() != 2 {
                    return Err(Self::error(number, "usage: QUERY <payload>"));
                }
                let payload = operands(1)?.remove(0);
                Ok(compose::compose_query(payload)?.into())
            }
            "SPAWN" => {
                arity(4, "SPAWN <network> <salt> <security> [<asset>...] {")?;
                if tokens.last() != Some(&BLOCK_OPEN) {
                    return Err(Self::error(number, "SPAWN line must end with `{`"));
                }
                let mut operands = parse_operands(&tokens[1..tokens.len() - 1])
                    .map_err(|m| Self::error(number, m))?;
                let assets = operands.split_off(3);
                let mut header = operands.into_iter();
                let (Some(network), Some(salt), Some(security)) = (header.next(), header.next(), header.next())
                else {
                    return Err(Self::error(number, "usage: SPAWN <network> <salt> <security> [<asset>...] {"));
                };
                if self.depth >= self.max_depth {
                    return Err(Self::error(
                        number,
                        format!("spawn nesting exceeds depth limit {}", self.max_depth),
                    ));
                }
                self.depth += 1;
                let program = self.program(Some(number))?;
                self.depth -= 1;
                Ok(compose::compose_spawn(network, salt, security, program.into(), assets)?.into())
            }
            other => Err(Self::error(number, format!("unknown instruction `{other}`"))),
        }
    }
}

/// Assembles source text into a validated program.
pub fn assemble_source(source: &str) -> Result<Program, XcvmError> {
    let mut parser = Parser {
        lines: tokenize(source),
        next: 0,
        depth: 0,
        max_depth: CodecLimits::global().max_spawn_depth,
    };
    parser.program(None)
}

/// Reads and assembles a source file.
pub fn assemble_file<P: AsRef<Path>>(path: P) -> Result<Program, XcvmError> {
    let source = fs::read_to_string(path.as_ref())?;
    assemble_source(&source)
}

/// Renders a program in the syntax [`assemble_source`] reads.
pub fn disassemble(program: &Program) -> String {
    let mut out = String::new();
    write_program(&mut out, program, 0);
    out
}

fn write_program(out: &mut String, program: &Program, depth: usize) {
    for instruction in program.instructions().iter() {
        out.push_str(&INDENT.repeat(depth));
        match instruction {
            Instruction::Transfer(transfer) => {
                out.push_str("TRANSFER ");
                match transfer.destination() {
                    Destination::Account(account) => out.push_str(&account.to_string()),
                    Destination::Relayer => out.push_str("relayer"),
                }
                for asset in transfer.assets() {
                    let _ = write!(out, " {asset}");
                }
            }
            Instruction::Call(call) => {
                let _ = write!(out, "CALL {}", call.payload());
                for binding in call.bindings().iter() {
                    let _ = write!(out, " {binding}");
                }
            }
            Instruction::Query(query) => {
                let _ = write!(out, "QUERY {}", query.payload);
            }
            Instruction::Spawn(spawn) => {
                let _ = write!(
                    out,
                    "SPAWN {} {} {}",
                    spawn.network(),
                    spawn.salt(),
                    spawn.security()
                );
                for asset in spawn.assets() {
                    let _ = write!(out, " {asset}");
                }
                out.push_str(" {\n");
                write_program(out, spawn.program(), depth + 1);
                out.push_str(&INDENT.repeat(depth));
                out.push('}');
            }
        }
        out.push('\n');
    }
}

/// Formats a compiler-style diagnostic pointing at the failing line.
pub fn render_diagnostic(file: &str, source: &str, err: &XcvmError) -> String {
    let XcvmError::Assembly { line, message } = err else {
        return format!("error: {err}\n");
    };

    let mut diag = String::new();
    let _ = writeln!(diag, "error: {message}");
    let _ = writeln!(diag, " --> {file}:{line}");
    if let Some(text) = source.lines().nth(line.saturating_sub(1)) {
        let _ = writeln!(diag, "  |");
        let _ = writeln!(diag, "{:>4} | {}", line, text.trim_end_matches('\r'));
    }
    diag
}
