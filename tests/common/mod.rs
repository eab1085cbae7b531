//! In-memory chain shared by the integration tests
//!
//! Models just enough of an EIP-7702 node for the scenarios: balances,
//! nonces, delegation designators and `destroy()` on delegated accounts.
//! SELFDESTRUCT follows pre-EIP-6780 semantics (code and balance are
//! cleared, balance goes to the caller). Gas is free.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256, U256, U64};

use scenarios::chain::{
    delegation_code, delegation_target, Account, ChainClient, ContractArtifact, ContractCall,
    Receipt, SignedAuthorization, TransactionRequest,
};
use scenarios::{Error, Result};

pub const CHAIN_ID: u64 = 31337;

#[derive(Debug, Default, Clone)]
struct AccountData {
    code: Bytes,
    balance: U256,
    nonce: u64,
}

#[derive(Default)]
struct State {
    accounts: HashMap<Address, AccountData>,
    contracts: HashMap<Address, &'static ContractArtifact>,
    receipts: HashMap<H256, Receipt>,
    next_id: u64,
    block: u64,
}

impl State {
    fn account(&mut self, address: Address) -> &mut AccountData {
        self.accounts.entry(address).or_default()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn mine(&mut self, status: u64, contract_address: Option<Address>, tx_type: u64) -> H256 {
        self.block += 1;
        let hash = H256::from_low_u64_be(0xfeed_0000 + self.next_id());
        self.receipts.insert(
            hash,
            Receipt {
                transaction_hash: hash,
                block_number: Some(U64::from(self.block)),
                status: Some(U64::from(status)),
                contract_address,
                gas_used: Some(U256::from(21_000u64)),
                transaction_type: Some(U64::from(tx_type)),
            },
        );
        hash
    }

    /// Artifact whose code runs when `address` is called
    fn callee(&self, address: Address) -> Option<&'static ContractArtifact> {
        let code = self.accounts.get(&address).map(|a| a.code.clone())?;
        let target = delegation_target(&code).unwrap_or(address);
        self.contracts.get(&target).copied()
    }
}

pub struct InMemoryChain {
    state: Mutex<State>,
    deployer: Address,
    reachable: Arc<AtomicBool>,
    reads: AtomicUsize,
}

impl InMemoryChain {
    pub fn new() -> Self {
        let deployer = Address::repeat_byte(0xde);
        let mut state = State::default();
        state.account(deployer).balance = U256::exp10(22);
        Self {
            state: Mutex::new(state),
            deployer,
            reachable: Arc::new(AtomicBool::new(true)),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn unreachable() -> Self {
        let chain = Self::new();
        chain.reachable.store(false, Ordering::SeqCst);
        chain
    }

    /// Shared switch; storing `false` makes every later call fail
    pub fn reachability(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.reachable)
    }

    /// Number of code/balance reads served so far
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn code(&self, address: Address) -> Bytes {
        let state = self.state.lock().unwrap();
        state
            .accounts
            .get(&address)
            .map(|a| a.code.clone())
            .unwrap_or_default()
    }

    pub fn balance(&self, address: Address) -> U256 {
        let state = self.state.lock().unwrap();
        state
            .accounts
            .get(&address)
            .map(|a| a.balance)
            .unwrap_or_default()
    }

    pub fn nonce(&self, address: Address) -> u64 {
        let state = self.state.lock().unwrap();
        state.accounts.get(&address).map(|a| a.nonce).unwrap_or(0)
    }

    fn check(&self, method: &str) -> Result<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Rpc {
                method: method.to_string(),
                code: -32000,
                message: "connection refused".to_string(),
            })
        }
    }

    fn execute(&self, from: Address, request: TransactionRequest) -> Result<H256> {
        let mut state = self.state.lock().unwrap();
        if !state.accounts.contains_key(&from) {
            return Err(Error::UnknownAccount(format!("{:?}", from)));
        }
        state.account(from).nonce += 1;

        let tx_type = if request.authorization_list.is_empty() { 2 } else { 4 };

        for auth in &request.authorization_list {
            if auth.chain_id != CHAIN_ID && auth.chain_id != 0 {
                continue;
            }
            let authority = state.account(auth.authority);
            if authority.nonce != auth.nonce {
                continue;
            }
            authority.nonce += 1;
            authority.code = if auth.address.is_zero() {
                Bytes::default()
            } else {
                delegation_code(auth.address)
            };
        }

        let Some(to) = request.to else {
            return Err(Error::Signing("contract creation goes through deploy_contract".into()));
        };

        if state.account(from).balance < request.value {
            return Ok(state.mine(0, None, tx_type));
        }
        state.account(from).balance -= request.value;
        state.account(to).balance += request.value;

        if !request.data.is_empty() {
            if let Some(artifact) = state.callee(to) {
                if artifact.is_call_to(&request.data, "destroy") {
                    let balance = std::mem::take(&mut state.account(to).balance);
                    state.account(from).balance += balance;
                    state.account(to).code = Bytes::default();
                } else {
                    return Ok(state.mine(0, None, tx_type));
                }
            }
        }

        Ok(state.mine(1, None, tx_type))
    }
}

#[async_trait]
impl ChainClient for InMemoryChain {
    fn endpoint(&self) -> String {
        "memory".to_string()
    }

    fn deployer(&self) -> Address {
        self.deployer
    }

    async fn chain_id(&self) -> Result<u64> {
        self.check("eth_chainId")?;
        Ok(CHAIN_ID)
    }

    async fn get_code(&self, address: Address) -> Result<Bytes> {
        self.check("eth_getCode")?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.code(address))
    }

    async fn get_balance(&self, address: Address) -> Result<U256> {
        self.check("eth_getBalance")?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.balance(address))
    }

    async fn create_account(&self, label: &str) -> Result<Account> {
        let mut state = self.state.lock().unwrap();
        let address = Address::from_low_u64_be(0x1000 + state.next_id());
        state.account(address);
        Ok(Account::new(label, address))
    }

    async fn deploy_contract(&self, from: Address, artifact: &ContractArtifact) -> Result<H256> {
        self.check("eth_sendRawTransaction")?;
        let artifact = ContractArtifact::find(artifact.name)
            .ok_or_else(|| Error::Configuration(format!("unknown artifact {}", artifact.name)))?;
        let code = artifact.creation_code()?;

        let mut state = self.state.lock().unwrap();
        state.account(from).nonce += 1;
        let address = Address::from_low_u64_be(0xc000 + state.next_id());
        state.account(address).code = code;
        state.contracts.insert(address, artifact);
        Ok(state.mine(1, Some(address), 2))
    }

    async fn wait_for_receipt(&self, hash: H256) -> Result<Receipt> {
        self.check("eth_getTransactionReceipt")?;
        let state = self.state.lock().unwrap();
        state
            .receipts
            .get(&hash)
            .cloned()
            .ok_or(Error::ReceiptTimeout { hash, secs: 0 })
    }

    async fn sign_authorization(
        &self,
        authority: Address,
        contract: Address,
        delegate: bool,
    ) -> Result<SignedAuthorization> {
        self.check("eth_getTransactionCount")?;
        let current = self.nonce(authority);
        Ok(SignedAuthorization {
            authority,
            chain_id: CHAIN_ID,
            address: contract,
            nonce: if delegate { current } else { current + 1 },
            y_parity: 0,
            r: U256::one(),
            s: U256::one(),
        })
    }

    async fn send_transaction(&self, from: Address, request: TransactionRequest) -> Result<H256> {
        self.check("eth_sendRawTransaction")?;
        self.execute(from, request)
    }

    async fn write_contract(&self, from: Address, call: ContractCall) -> Result<H256> {
        self.check("eth_sendRawTransaction")?;
        let request = TransactionRequest {
            to: Some(call.address),
            value: call.value,
            data: call.artifact.encode_call(&call.function)?,
            authorization_list: call.authorization_list,
        };
        self.execute(from, request)
    }
}
