use crate::{config::ChainConfig, errors::ValidationError};
use alloy::{
    primitives::{Address, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    sol,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, instrument};
use utils::errors::{INVALID_CONTRACT_ADDRESS, INVALID_RPC_URL};

sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IAaveGovernanceV3 {
        function getProposal(uint256 proposalId) external view returns (
            uint256 id,
            address creator,
            uint40 startTime,
            uint40 endTime,
            uint256 forVotes,
            uint256 againstVotes,
            uint8 state,
            bool executed,
            bool canceled
        );
    }
);

/// Proposal tuple as returned by the governance contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnChainProposal {
    pub id: U256,
    pub creator: Address,
    pub start_time: u64,
    pub end_time: u64,
    pub for_votes: U256,
    pub against_votes: U256,
    pub state: u8,
    pub executed: bool,
    pub canceled: bool,
}

/// Direct contract read against one chain's governance deployment.
#[async_trait]
pub trait ProposalReader: Send + Sync {
    fn chain(&self) -> &ChainConfig;

    async fn get_proposal(&self, proposal_id: U256) -> Result<OnChainProposal>;
}

pub struct AlloyProposalReader {
    chain: ChainConfig,
    contract: IAaveGovernanceV3::IAaveGovernanceV3Instance<DynProvider>,
}

impl AlloyProposalReader {
    pub fn new(chain: ChainConfig) -> Result<Self> {
        let address: Address = chain
            .contract_address
            .parse()
            .with_context(|| format!("{}: {}", INVALID_CONTRACT_ADDRESS, chain.contract_address))?;

        let provider = ProviderBuilder::new()
            .connect_http(
                chain
                    .rpc_url
                    .parse()
                    .with_context(|| format!("{}: {}", INVALID_RPC_URL, chain.rpc_url))?,
            )
            .erased();

        Ok(Self {
            chain,
            contract: IAaveGovernanceV3::new(address, provider),
        })
    }

    /// One reader per configured chain, keeping the configured order.
    pub fn for_chains(chains: &[ChainConfig]) -> Result<Vec<Box<dyn ProposalReader>>> {
        chains
            .iter()
            .cloned()
            .map(|chain| Ok(Box::new(Self::new(chain)?) as Box<dyn ProposalReader>))
            .collect()
    }
}

#[async_trait]
impl ProposalReader for AlloyProposalReader {
    fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    #[instrument(name = "get_onchain_proposal", skip(self), fields(chain = %self.chain.name))]
    async fn get_proposal(&self, proposal_id: U256) -> Result<OnChainProposal> {
        let proposal = self
            .contract
            .getProposal(proposal_id)
            .call()
            .await
            .context("gov_contract.getProposal")?;

        debug!(id = %proposal.id, state = proposal.state, "Contract returned proposal");

        Ok(OnChainProposal {
            id: proposal.id,
            creator: proposal.creator,
            start_time: proposal.startTime.to::<u64>(),
            end_time: proposal.endTime.to::<u64>(),
            for_votes: proposal.forVotes,
            against_votes: proposal.againstVotes,
            state: proposal.state,
            executed: proposal.executed,
            canceled: proposal.canceled,
        })
    }
}

/// A contract answer only counts when it is about the requested proposal and has a voting window.
pub fn validate(requested: U256, proposal: &OnChainProposal) -> Result<(), ValidationError> {
    if proposal.id != requested {
        return Err(ValidationError::IdMismatch {
            requested,
            returned: proposal.id,
        });
    }

    if proposal.start_time == 0 || proposal.end_time == 0 {
        return Err(ValidationError::ZeroTimestamps {
            start: proposal.start_time,
            end: proposal.end_time,
        });
    }

    Ok(())
}
