use alloy_primitives::{Address, LogData, B256, U256};
use alloy_sol_types::SolEvent;
use allocation_guard_types::{ActionKind, Role};

use crate::abi;

/// State transitions recorded by the engine, in emission order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    WhitelistUpdated { user: Address, whitelisted: bool },
    ProtocolApprovalUpdated { protocol: Address, approved: bool },
    AllowedSelectorsUpdated { protocol: Address, count: usize },
    ProtocolParamsUpdated { protocol: Address, is_lending: bool, concentration_cap_bps: u16 },
    GuardianUpdated { guardian: Address, active: bool },
    RelayerUpdated { relayer: Address, active: bool },
    LimitsUpdated { max_tx_amount: u64, daily_cap: u64, large_transfer_threshold: u64 },
    Paused { by: Address, circuit_breaker: bool },
    Unpaused { by: Address },
    AllocationExecuted {
        user: Address,
        protocol: Address,
        kind: ActionKind,
        nonce: U256,
        amount: U256,
        amount_out: U256,
    },
    AllocationFailed { user: Address, protocol: Address, nonce: U256, consecutive_failures: u32 },
    ProposalCreated { action_hash: B256, user: Address, amount: U256, required_approvals: u32 },
    ProposalApproved { action_hash: B256, approver: Address, approvals: u32 },
    ProposalExecuted { action_hash: B256 },
    ProposalExpired { action_hash: B256 },
    TimelockScheduled { id: u64, executable_after: u64 },
    TimelockExecuted { id: u64 },
    TimelockCancelled { id: u64 },
    PrincipalChanged { role: Role, previous: Address, current: Address },
    OracleUpdated { price_feed: Address, sequencer_feed: Option<Address> },
    GovernanceUpdated { required_approvals: u32, timelock_delay_secs: u64 },
}

impl EngineEvent {
    /// ABI-encode as an EVM log (topics + data).
    pub fn to_log_data(&self) -> LogData {
        match self {
            Self::WhitelistUpdated { user, whitelisted } => abi::WhitelistUpdated {
                user: *user,
                whitelisted: *whitelisted,
            }
            .encode_log_data(),
            Self::ProtocolApprovalUpdated { protocol, approved } => abi::ProtocolApprovalUpdated {
                protocol: *protocol,
                approved: *approved,
            }
            .encode_log_data(),
            Self::AllowedSelectorsUpdated { protocol, count } => abi::AllowedSelectorsUpdated {
                protocol: *protocol,
                count: U256::from(*count),
            }
            .encode_log_data(),
            Self::ProtocolParamsUpdated { protocol, is_lending, concentration_cap_bps } => {
                abi::ProtocolParamsUpdated {
                    protocol: *protocol,
                    isLending: *is_lending,
                    concentrationCapBps: *concentration_cap_bps,
                }
                .encode_log_data()
            }
            Self::GuardianUpdated { guardian, active } => abi::GuardianUpdated {
                guardian: *guardian,
                active: *active,
            }
            .encode_log_data(),
            Self::RelayerUpdated { relayer, active } => abi::RelayerUpdated {
                relayer: *relayer,
                active: *active,
            }
            .encode_log_data(),
            Self::LimitsUpdated { max_tx_amount, daily_cap, large_transfer_threshold } => {
                abi::LimitsUpdated {
                    maxTxAmount: U256::from(*max_tx_amount),
                    dailyCap: U256::from(*daily_cap),
                    largeTransferThreshold: U256::from(*large_transfer_threshold),
                }
                .encode_log_data()
            }
            Self::Paused { by, circuit_breaker } => abi::Paused {
                by: *by,
                circuitBreaker: *circuit_breaker,
            }
            .encode_log_data(),
            Self::Unpaused { by } => abi::Unpaused { by: *by }.encode_log_data(),
            Self::AllocationExecuted { user, protocol, kind, nonce, amount, amount_out } => {
                abi::AllocationExecuted {
                    user: *user,
                    protocol: *protocol,
                    kind: *kind as u8,
                    nonce: *nonce,
                    amount: *amount,
                    amountOut: *amount_out,
                }
                .encode_log_data()
            }
            Self::AllocationFailed { user, protocol, nonce, consecutive_failures } => {
                abi::AllocationFailed {
                    user: *user,
                    protocol: *protocol,
                    nonce: *nonce,
                    consecutiveFailures: *consecutive_failures,
                }
                .encode_log_data()
            }
            Self::ProposalCreated { action_hash, user, amount, required_approvals } => {
                abi::ProposalCreated {
                    actionHash: *action_hash,
                    user: *user,
                    amount: *amount,
                    requiredApprovals: *required_approvals,
                }
                .encode_log_data()
            }
            Self::ProposalApproved { action_hash, approver, approvals } => abi::ProposalApproved {
                actionHash: *action_hash,
                approver: *approver,
                approvals: *approvals,
            }
            .encode_log_data(),
            Self::ProposalExecuted { action_hash } => abi::ProposalExecuted {
                actionHash: *action_hash,
            }
            .encode_log_data(),
            Self::ProposalExpired { action_hash } => abi::ProposalExpired {
                actionHash: *action_hash,
            }
            .encode_log_data(),
            Self::TimelockScheduled { id, executable_after } => abi::TimelockScheduled {
                id: *id,
                executableAfter: *executable_after,
            }
            .encode_log_data(),
            Self::TimelockExecuted { id } => abi::TimelockExecuted { id: *id }.encode_log_data(),
            Self::TimelockCancelled { id } => abi::TimelockCancelled { id: *id }.encode_log_data(),
            Self::PrincipalChanged { role, previous, current } => abi::PrincipalChanged {
                role: role_code(*role),
                previous: *previous,
                current: *current,
            }
            .encode_log_data(),
            Self::OracleUpdated { price_feed, sequencer_feed } => abi::OracleUpdated {
                priceFeed: *price_feed,
                sequencerFeed: sequencer_feed.unwrap_or(Address::ZERO),
            }
            .encode_log_data(),
            Self::GovernanceUpdated { required_approvals, timelock_delay_secs } => {
                abi::GovernanceUpdated {
                    requiredApprovals: *required_approvals,
                    timelockDelay: *timelock_delay_secs,
                }
                .encode_log_data()
            }
        }
    }
}

fn role_code(role: Role) -> u8 {
    match role {
        Role::Admin => 0,
        Role::Agent => 1,
        Role::Guardian => 2,
    }
}
