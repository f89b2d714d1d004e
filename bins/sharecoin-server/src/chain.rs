//! ShareCoin contract access over JSON-RPC.
//!
//! Reads go through `eth_call`; batch settlement is a transaction signed by
//! the service key and awaited until mined. Every call is bounded by the
//! configured timeout so a stalled node fails the tick instead of hanging it.

use std::fmt::Display;
use std::future::IntoFuture;
use std::time::Duration;

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::transports::http::reqwest::Url;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use sharecoin_sim::error::GatewayError;
use sharecoin_sim::gateway::{ChainGateway, SubmitReceipt};
use sharecoin_sim::UserAddress;

use crate::config::Config;

sol! {
    #[sol(rpc)]
    interface IShareCoin {
        function subscriptionActiveFor(address user) external view returns (bool);
        function userPlan(address user) external view returns (uint8);
        function getBlockHistoryLength() external view returns (uint256);
        function blockAlreadyUsed(address user, uint256 blockNumber) external view returns (bool);
        function serverSubmitMultipleMinedBlocksAndMintOnBehalf(
            address user,
            uint256[] blockNumbers,
            uint256[] nonces
        ) external;
    }
}

/// Waiting for a receipt spans block production, so it gets more headroom
/// than a plain read.
const RECEIPT_TIMEOUT_FACTOR: u32 = 4;

pub struct EvmGateway {
    contract: IShareCoin::IShareCoinInstance<DynProvider>,
    timeout: Duration,
}

impl EvmGateway {
    /// Build the signing provider and contract binding. Does not touch the
    /// network; the first call does.
    pub fn connect(config: &Config) -> Result<Self> {
        let signer: PrivateKeySigner = config
            .private_key
            .trim()
            .parse()
            .context("SHARECOIN_PRIVATE_KEY is not a valid secp256k1 key")?;
        let url: Url = config
            .rpc_url
            .parse()
            .with_context(|| format!("Invalid RPC URL {}", config.rpc_url))?;
        let contract_address: Address = config
            .contract_address
            .trim()
            .parse()
            .context("SHARECOIN_CONTRACT_ADDRESS is not a valid address")?;

        info!(
            signer = %signer.address(),
            contract = %contract_address,
            "Chain gateway configured"
        );

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        Ok(Self {
            contract: IShareCoin::new(contract_address, provider),
            timeout: config.rpc_timeout,
        })
    }

    async fn bounded<T, E: Display>(
        &self,
        limit: Duration,
        call: impl IntoFuture<Output = Result<T, E>>,
    ) -> Result<T, GatewayError> {
        match tokio::time::timeout(limit, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(GatewayError::Rpc(e.to_string())),
            Err(_) => Err(GatewayError::Timeout(limit.as_secs())),
        }
    }
}

fn evm_address(user: &UserAddress) -> Result<Address, GatewayError> {
    user.as_str()
        .parse()
        .map_err(|e| GatewayError::Rpc(format!("cannot encode {user}: {e}")))
}

#[async_trait]
impl ChainGateway for EvmGateway {
    async fn is_subscription_active(&self, user: &UserAddress) -> Result<bool, GatewayError> {
        let call = self.contract.subscriptionActiveFor(evm_address(user)?);
        self.bounded(self.timeout, call.call()).await
    }

    async fn plan_of(&self, user: &UserAddress) -> Result<u64, GatewayError> {
        let call = self.contract.userPlan(evm_address(user)?);
        let tier = self.bounded(self.timeout, call.call()).await?;
        Ok(u64::from(tier))
    }

    async fn confirmed_block_count(&self) -> Result<u64, GatewayError> {
        let call = self.contract.getBlockHistoryLength();
        let length = self.bounded(self.timeout, call.call()).await?;
        u64::try_from(length)
            .map_err(|_| GatewayError::InvalidResponse(format!("block history length {length}")))
    }

    async fn is_block_consumed(
        &self,
        user: &UserAddress,
        block_number: u64,
    ) -> Result<bool, GatewayError> {
        let call = self
            .contract
            .blockAlreadyUsed(evm_address(user)?, U256::from(block_number));
        self.bounded(self.timeout, call.call()).await
    }

    async fn submit_batch(
        &self,
        user: &UserAddress,
        block_numbers: &[u64],
        nonces: &[u64],
    ) -> Result<SubmitReceipt, GatewayError> {
        let numbers: Vec<U256> = block_numbers.iter().map(|n| U256::from(*n)).collect();
        let nonces: Vec<U256> = nonces.iter().map(|n| U256::from(*n)).collect();
        let call = self
            .contract
            .serverSubmitMultipleMinedBlocksAndMintOnBehalf(evm_address(user)?, numbers, nonces);

        let pending = self.bounded(self.timeout, call.send()).await?;
        let tx_hash = *pending.tx_hash();
        info!(%user, tx = %tx_hash, "Settlement transaction sent");

        let receipt = self
            .bounded(self.timeout * RECEIPT_TIMEOUT_FACTOR, pending.get_receipt())
            .await?;
        if !receipt.status() {
            return Err(GatewayError::Reverted(tx_hash.to_string()));
        }

        Ok(SubmitReceipt {
            tx_hash: tx_hash.to_string(),
        })
    }
}
