//! Method signatures and selectors

use crate::constants::SELECTOR_SIZE;
use crate::errors::{Arc4Error, Arc4Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512_256};
use std::fmt;
use std::str::FromStr;

/// Return type name of methods that return nothing
pub const VOID: &str = "void";

/// 4-byte method selector: SHA-512/256 of the canonical signature, truncated
pub fn method_selector(signature: &str) -> [u8; SELECTOR_SIZE] {
    let hash = Sha512_256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Canonical `name(arg1,arg2,...)returns` signature
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodSignature {
    pub name: String,
    /// Argument type names; transaction and reference types are allowed
    pub args: Vec<String>,
    pub returns: String,
}

impl MethodSignature {
    pub fn new(name: &str, args: Vec<String>, returns: &str) -> Self {
        Self {
            name: name.to_string(),
            args,
            returns: returns.to_string(),
        }
    }

    pub fn selector(&self) -> [u8; SELECTOR_SIZE] {
        method_selector(&self.to_string())
    }

    pub fn is_void(&self) -> bool {
        self.returns == VOID
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}){}", self.name, self.args.join(","), self.returns)
    }
}

impl FromStr for MethodSignature {
    type Err = Arc4Error;

    fn from_str(s: &str) -> Arc4Result<Self> {
        let open = s
            .find('(')
            .ok_or_else(|| Arc4Error::InvalidSignature(format!("missing '(' in '{}'", s)))?;
        let name = &s[..open];
        if name.is_empty() {
            return Err(Arc4Error::InvalidSignature(format!("missing method name in '{}'", s)));
        }

        // find the parenthesis closing the argument list
        let mut depth = 0usize;
        let mut close = None;
        for (i, c) in s[open..].char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(open + i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let close = close.ok_or_else(|| Arc4Error::InvalidSignature(format!("unbalanced parentheses in '{}'", s)))?;

        let returns = &s[close + 1..];
        if returns.is_empty() {
            return Err(Arc4Error::InvalidSignature(format!("missing return type in '{}'", s)));
        }

        Ok(Self {
            name: name.to_string(),
            args: split_top_level(&s[open + 1..close]),
            returns: returns.to_string(),
        })
    }
}

/// Split on commas that are not nested inside parentheses
fn split_top_level(list: &str) -> Vec<String> {
    if list.is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(list[start..i].to_string());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(list[start..].to_string());
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_deterministic() {
        let a = method_selector("greet(string)string");
        let b = method_selector("greet(string)string");
        assert_eq!(a, b);
        assert_ne!(a, method_selector("greet(string)void"));
    }

    #[test]
    fn test_known_selector() {
        // add(uint64,uint64)uint128 from the ARC-4 reference
        assert_eq!(hex::encode(method_selector("add(uint64,uint64)uint128")), "8aa3b61f");
    }

    #[test]
    fn test_parse_nested_args() {
        let sig: MethodSignature = "swap((uint64,address),pay,byte[])void".parse().unwrap();
        assert_eq!(sig.name, "swap");
        assert_eq!(sig.args, vec!["(uint64,address)", "pay", "byte[]"]);
        assert!(sig.is_void());
        assert_eq!(sig.to_string(), "swap((uint64,address),pay,byte[])void");
    }

    #[test]
    fn test_parse_no_args() {
        let sig: MethodSignature = "create()void".parse().unwrap();
        assert!(sig.args.is_empty());
        assert_eq!(sig.selector(), method_selector("create()void"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("noparens".parse::<MethodSignature>().is_err());
        assert!("f(uint64".parse::<MethodSignature>().is_err());
        assert!("f(uint64)".parse::<MethodSignature>().is_err());
        assert!("(uint64)void".parse::<MethodSignature>().is_err());
    }
}
