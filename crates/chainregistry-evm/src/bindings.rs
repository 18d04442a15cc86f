//! Event ABI of every registry contract.
//!
//! Only the events the router understands are declared. Events shared by
//! several contracts (`ScannerUpdated`, `StakeThresholdChanged`) are declared
//! per contract because their shapes differ.

use alloy_sol_types::sol;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface ScannerRegistry {
        event ScannerUpdated(uint256 indexed scannerId, uint256 indexed chainId, string metadata);
        event ScannerEnabled(uint256 indexed scannerId, bool indexed enabled, uint8 permission, bool value);
        event StakeThresholdChanged(uint256 indexed chainId, uint256 min, uint256 max, bool activated);
    }
}

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface ScannerPoolRegistry {
        event ScannerUpdated(uint256 indexed scannerId, uint256 indexed chainId, string metadata, uint256 scannerPool);
        event ManagedStakeThresholdChanged(uint256 indexed chainId, uint256 min, uint256 max, bool activated);
        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);
        event ScannerPoolRegistered(uint256 indexed scannerPoolId, uint256 indexed chainId);
        event EnabledScannersChanged(uint256 indexed scannerPoolId, uint256 enabledScanners);
    }
}

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface AgentRegistry {
        event AgentUpdated(uint256 indexed agentId, address indexed by, string metadata, uint256[] chainIds);
        event AgentEnabled(uint256 indexed agentId, bool indexed enabled, uint8 permission, bool value);
        event StakeThresholdChanged(uint256 min, uint256 max, bool activated);
    }
}

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface ScannerNodeVersion {
        event ScannerNodeVersionUpdated(string newVersion, string oldVersion);
    }
}

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface StakeAllocator {
        event AllocatedStake(uint8 indexed subjectType, uint256 indexed subject, bool increase, uint256 amount, uint256 totalAllocated);
    }
}

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface Dispatch {
        event Link(uint256 agentId, uint256 scannerId, bool enable);
        event AlreadyLinked(uint256 agentId, uint256 scannerId, bool enable);
    }
}

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface FortaStaking {
        event StakeDeposited(uint8 indexed subjectType, uint256 indexed subject, address indexed account, uint256 amount);
        event WithdrawalInitiated(uint8 indexed subjectType, uint256 indexed subject, address indexed account, uint64 deadline);
        event Slashed(uint8 indexed subjectType, uint256 indexed subject, address indexed by, uint256 value);
        event TransferSingle(address indexed operator, address indexed from, address indexed to, uint256 id, uint256 value);
        event TransferBatch(address indexed operator, address indexed from, address indexed to, uint256[] ids, uint256[] values);
    }
}

sol! {
    /// ERC-1967 proxy event, emitted by every upgradeable registry contract.
    #[derive(Debug, PartialEq, Eq)]
    event Upgraded(address indexed implementation);
}
