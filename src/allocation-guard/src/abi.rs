//! Solidity ABI surface: emitted events and the protocol calls the wallet commonly allows.

use alloy_sol_types::{sol, SolCall};

use allocation_guard_types::Selector;

sol! {
    event WhitelistUpdated(address indexed user, bool whitelisted);
    event ProtocolApprovalUpdated(address indexed protocol, bool approved);
    event AllowedSelectorsUpdated(address indexed protocol, uint256 count);
    event ProtocolParamsUpdated(address indexed protocol, bool isLending, uint16 concentrationCapBps);
    event GuardianUpdated(address indexed guardian, bool active);
    event RelayerUpdated(address indexed relayer, bool active);
    event LimitsUpdated(uint256 maxTxAmount, uint256 dailyCap, uint256 largeTransferThreshold);
    event Paused(address indexed by, bool circuitBreaker);
    event Unpaused(address indexed by);
    event AllocationExecuted(
        address indexed user,
        address indexed protocol,
        uint8 kind,
        uint256 nonce,
        uint256 amount,
        uint256 amountOut
    );
    event AllocationFailed(address indexed user, address indexed protocol, uint256 nonce, uint32 consecutiveFailures);
    event ProposalCreated(bytes32 indexed actionHash, address indexed user, uint256 amount, uint32 requiredApprovals);
    event ProposalApproved(bytes32 indexed actionHash, address indexed approver, uint32 approvals);
    event ProposalExecuted(bytes32 indexed actionHash);
    event ProposalExpired(bytes32 indexed actionHash);
    event TimelockScheduled(uint64 indexed id, uint64 executableAfter);
    event TimelockExecuted(uint64 indexed id);
    event TimelockCancelled(uint64 indexed id);
    event PrincipalChanged(uint8 indexed role, address previous, address current);
    event OracleUpdated(address priceFeed, address sequencerFeed);
    event GovernanceUpdated(uint32 requiredApprovals, uint64 timelockDelay);
}

sol! {
    /// Calls a vault typically routes to lending pools, vaults and tokens.
    interface IAllocationTarget {
        function approve(address spender, uint256 amount) external returns (bool);
        function transfer(address to, uint256 amount) external returns (bool);
        function supply(address asset, uint256 amount, address onBehalfOf, uint16 referralCode) external;
        function withdraw(address asset, uint256 amount, address to) external returns (uint256);
        function deposit(uint256 assets, address receiver) external returns (uint256);
        function redeem(uint256 shares, address receiver, address owner) external returns (uint256);
    }
}

/// Human-readable name of a well-known selector, for logs.
pub fn selector_label(selector: Selector) -> &'static str {
    use IAllocationTarget::*;
    match selector {
        s if s == approveCall::SELECTOR => "approve",
        s if s == transferCall::SELECTOR => "transfer",
        s if s == supplyCall::SELECTOR => "supply",
        s if s == withdrawCall::SELECTOR => "withdraw",
        s if s == depositCall::SELECTOR => "deposit",
        s if s == redeemCall::SELECTOR => "redeem",
        _ => "unknown",
    }
}
