//! Contract artifacts deployed by the scenarios
//!
//! An artifact is creation bytecode plus the signatures of the functions the
//! scenarios call. Only zero-argument functions are supported, which is all
//! `SimpleDelegation` needs.

use ethers::types::Bytes;
use ethers::utils::id;

use crate::common::{Error, Result};

/// Deployable contract: creation code and callable function signatures
#[derive(Debug, PartialEq, Eq)]
pub struct ContractArtifact {
    pub name: &'static str,
    /// Function signatures, e.g. `destroy()`
    pub functions: &'static [&'static str],
    /// Hex-encoded creation bytecode
    pub bytecode: &'static str,
}

/// `SimpleDelegation`: `destroy()` self-destructs, sending the balance to `msg.sender`
///
/// Hand-assembled from `contracts/SimpleDelegation.sol`. The creation code
/// copies the 19-byte runtime below and returns it:
///
/// ```text
/// PUSH1 0 CALLDATALOAD PUSH1 0xe0 SHR     selector
/// PUSH4 0x83197ef0 EQ PUSH1 0x10 JUMPI    destroy()
/// STOP
/// JUMPDEST CALLER SELFDESTRUCT
/// ```
pub static SIMPLE_DELEGATION: ContractArtifact = ContractArtifact {
    name: "SimpleDelegation",
    functions: &["destroy()"],
    bytecode: "0x601380600b6000396000f3\
               60003560e01c6383197ef014601057005b33ff",
};

static ARTIFACTS: &[&ContractArtifact] = &[&SIMPLE_DELEGATION];

impl ContractArtifact {
    /// Look up a known artifact by contract name
    pub fn find(name: &str) -> Option<&'static ContractArtifact> {
        ARTIFACTS.iter().copied().find(|a| a.name == name)
    }

    /// Decoded creation bytecode
    pub fn creation_code(&self) -> Result<Bytes> {
        let hex_code = self.bytecode.trim_start_matches("0x");
        hex::decode(hex_code)
            .map(Bytes::from)
            .map_err(|e| Error::Configuration(format!("{} bytecode is not hex: {}", self.name, e)))
    }

    /// Full signature of `function`, matched by name
    pub fn signature(&self, function: &str) -> Result<&'static str> {
        self.functions
            .iter()
            .copied()
            .find(|sig| sig.split('(').next() == Some(function))
            .ok_or_else(|| Error::unknown_function(self.name, function))
    }

    /// Calldata for a zero-argument call of `function`
    pub fn encode_call(&self, function: &str) -> Result<Bytes> {
        let signature = self.signature(function)?;
        if !signature.ends_with("()") {
            return Err(Error::Configuration(format!(
                "{}.{} takes arguments, which scenarios cannot pass",
                self.name, signature
            )));
        }
        Ok(Bytes::from(id(signature).to_vec()))
    }

    /// Whether `calldata` invokes `function`
    pub fn is_call_to(&self, calldata: &[u8], function: &str) -> bool {
        match self.signature(function) {
            Ok(signature) => calldata.len() >= 4 && calldata[..4] == id(signature),
            Err(_) => false,
        }
    }
}
