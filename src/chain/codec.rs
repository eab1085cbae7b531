//! Typed transaction encoding and signing
//!
//! Envelopes are `type || rlp(fields)`:
//! ```text
//! 0x02  [chainId, nonce, maxPriorityFee, maxFee, gas, to, value, data, accessList, y, r, s]
//! 0x04  [chainId, nonce, maxPriorityFee, maxFee, gas, to, value, data, accessList,
//!        authorizationList, y, r, s]
//! ```
//! An authorization is signed over `keccak256(0x05 || rlp([chainId, address, nonce]))`
//! and encoded as `[chainId, address, nonce, yParity, r, s]`.

use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, Signature, H256, U256};
use ethers::utils::keccak256;
use rlp::RlpStream;

use crate::common::{Error, Result};

use super::types::SignedAuthorization;

pub const TX_TYPE_EIP1559: u8 = 0x02;
pub const TX_TYPE_EIP7702: u8 = 0x04;

const AUTHORIZATION_MAGIC: u8 = 0x05;

/// Hash an authority signs to delegate to `address`
pub fn authorization_hash(chain_id: u64, address: Address, nonce: u64) -> H256 {
    let mut stream = RlpStream::new_list(3);
    stream.append(&chain_id);
    stream.append(&address);
    stream.append(&nonce);

    let mut message = vec![AUTHORIZATION_MAGIC];
    message.extend_from_slice(&stream.out());
    H256::from(keccak256(message))
}

/// Sign an authorization delegating `wallet`'s account to `address`
pub fn sign_authorization(
    wallet: &LocalWallet,
    chain_id: u64,
    address: Address,
    nonce: u64,
) -> Result<SignedAuthorization> {
    let signature = wallet.sign_hash(authorization_hash(chain_id, address, nonce))?;

    Ok(SignedAuthorization {
        authority: wallet.address(),
        chain_id,
        address,
        nonce,
        y_parity: y_parity(&signature),
        r: signature.r,
        s: signature.s,
    })
}

/// Normalize a legacy `v` (27/28) to a y-parity bit
fn y_parity(signature: &Signature) -> u8 {
    if signature.v >= 27 {
        (signature.v - 27) as u8
    } else {
        signature.v as u8
    }
}

/// A transaction ready to be signed
#[derive(Debug, Clone)]
pub struct UnsignedTransaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub max_priority_fee_per_gas: U256,
    pub max_fee_per_gas: U256,
    pub gas_limit: u64,
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
    pub authorization_list: Vec<SignedAuthorization>,
}

impl UnsignedTransaction {
    /// EIP-7702 when carrying authorizations, EIP-1559 otherwise
    pub fn tx_type(&self) -> u8 {
        if self.authorization_list.is_empty() {
            TX_TYPE_EIP1559
        } else {
            TX_TYPE_EIP7702
        }
    }

    fn field_count(&self) -> usize {
        if self.authorization_list.is_empty() {
            9
        } else {
            10
        }
    }

    fn append_fields(&self, stream: &mut RlpStream) {
        stream.append(&self.chain_id);
        stream.append(&self.nonce);
        stream.append(&self.max_priority_fee_per_gas);
        stream.append(&self.max_fee_per_gas);
        stream.append(&self.gas_limit);
        match &self.to {
            Some(to) => stream.append(to),
            None => stream.append_empty_data(),
        };
        stream.append(&self.value);
        stream.append(&self.data.to_vec());
        stream.begin_list(0);

        if !self.authorization_list.is_empty() {
            stream.begin_list(self.authorization_list.len());
            for auth in &self.authorization_list {
                stream.begin_list(6);
                stream.append(&auth.chain_id);
                stream.append(&auth.address);
                stream.append(&auth.nonce);
                stream.append(&auth.y_parity);
                stream.append(&auth.r);
                stream.append(&auth.s);
            }
        }
    }

    fn envelope(&self, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + payload.len());
        out.push(self.tx_type());
        out.extend_from_slice(payload);
        out
    }

    /// Hash the sender signs
    pub fn signing_hash(&self) -> H256 {
        let mut stream = RlpStream::new_list(self.field_count());
        self.append_fields(&mut stream);
        H256::from(keccak256(self.envelope(&stream.out())))
    }

    /// Sign with `wallet` and return the raw envelope for `eth_sendRawTransaction`
    pub fn sign(&self, wallet: &LocalWallet) -> Result<Bytes> {
        if self.to.is_none() && !self.authorization_list.is_empty() {
            return Err(Error::Signing(
                "EIP-7702 transactions cannot create contracts".to_string(),
            ));
        }

        let signature = wallet.sign_hash(self.signing_hash())?;

        let mut stream = RlpStream::new_list(self.field_count() + 3);
        self.append_fields(&mut stream);
        stream.append(&y_parity(&signature));
        stream.append(&signature.r);
        stream.append(&signature.s);

        Ok(Bytes::from(self.envelope(&stream.out())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::DEFAULT_DEPLOYER_KEY;

    fn deployer() -> LocalWallet {
        DEFAULT_DEPLOYER_KEY.parse().unwrap()
    }

    fn transfer() -> UnsignedTransaction {
        UnsignedTransaction {
            chain_id: 31337,
            nonce: 0,
            max_priority_fee_per_gas: U256::from(1_000_000_000u64),
            max_fee_per_gas: U256::from(3_000_000_000u64),
            gas_limit: 21_000,
            to: Some(Address::repeat_byte(0x11)),
            value: U256::exp10(18),
            data: Bytes::default(),
            authorization_list: Vec::new(),
        }
    }

    #[test]
    fn test_deployer_address() {
        let expected: Address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap();
        assert_eq!(deployer().address(), expected);
    }

    #[test]
    fn test_authorization_recovers_authority() {
        let wallet = deployer();
        let contract = Address::repeat_byte(0x22);
        let auth = sign_authorization(&wallet, 31337, contract, 7).unwrap();

        assert_eq!(auth.authority, wallet.address());
        assert!(auth.y_parity <= 1);

        let signature = Signature {
            r: auth.r,
            s: auth.s,
            v: auth.y_parity as u64 + 27,
        };
        let recovered = signature
            .recover(authorization_hash(31337, contract, 7))
            .unwrap();
        assert_eq!(recovered, wallet.address());
    }

    #[test]
    fn test_authorization_hash_depends_on_nonce() {
        let contract = Address::repeat_byte(0x22);
        assert_ne!(
            authorization_hash(31337, contract, 0),
            authorization_hash(31337, contract, 1)
        );
    }

    #[test]
    fn test_eip1559_envelope() {
        let raw = transfer().sign(&deployer()).unwrap();
        assert_eq!(raw[0], TX_TYPE_EIP1559);

        let body = rlp::Rlp::new(&raw[1..]);
        assert_eq!(body.item_count().unwrap(), 12);
        let chain_id: u64 = body.val_at(0).unwrap();
        assert_eq!(chain_id, 31337);
    }

    #[test]
    fn test_eip7702_envelope_carries_authorizations() {
        let wallet = deployer();
        let auth = sign_authorization(&wallet, 31337, Address::repeat_byte(0x22), 0).unwrap();
        let mut tx = transfer();
        tx.value = U256::zero();
        tx.authorization_list = vec![auth.clone()];

        let raw = tx.sign(&wallet).unwrap();
        assert_eq!(raw[0], TX_TYPE_EIP7702);

        let body = rlp::Rlp::new(&raw[1..]);
        assert_eq!(body.item_count().unwrap(), 13);

        let auths = body.at(9).unwrap();
        assert_eq!(auths.item_count().unwrap(), 1);
        let tuple = auths.at(0).unwrap();
        assert_eq!(tuple.item_count().unwrap(), 6);
        let delegate: Address = tuple.val_at(1).unwrap();
        assert_eq!(delegate, auth.address);
    }

    #[test]
    fn test_signature_recovers_sender() {
        let wallet = deployer();
        let tx = transfer();
        let raw = tx.sign(&wallet).unwrap();

        let body = rlp::Rlp::new(&raw[1..]);
        let v: u64 = body.val_at(9).unwrap();
        let signature = Signature {
            r: body.val_at(10).unwrap(),
            s: body.val_at(11).unwrap(),
            v: v + 27,
        };
        assert_eq!(signature.recover(tx.signing_hash()).unwrap(), wallet.address());
    }

    #[test]
    fn test_contract_creation_has_empty_to() {
        let mut tx = transfer();
        tx.to = None;
        tx.data = Bytes::from(vec![0x60, 0x00]);
        let raw = tx.sign(&deployer()).unwrap();

        let body = rlp::Rlp::new(&raw[1..]);
        assert!(body.at(5).unwrap().is_empty());
    }

    #[test]
    fn test_set_code_transaction_needs_recipient() {
        let wallet = deployer();
        let mut tx = transfer();
        tx.to = None;
        tx.authorization_list =
            vec![sign_authorization(&wallet, 31337, Address::repeat_byte(0x22), 0).unwrap()];
        assert!(matches!(tx.sign(&wallet), Err(Error::Signing(_))));
    }
}
