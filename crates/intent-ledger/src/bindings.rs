//! Contract bindings for the intent ledgers and the OP-stack settlement contracts.

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function transfer(address to, uint256 amount) external returns (bool);
        function approve(address spender, uint256 amount) external returns (bool);
        function transferFrom(address from, address to, uint256 amount) external returns (bool);
        function balanceOf(address owner) external view returns (uint256);
    }

    #[sol(rpc)]
    contract IntentSource {
        #[derive(Debug)]
        struct Intent {
            address creator;
            uint256 destinationChainID;
            address inbox;
            address[] targets;
            bytes[] data;
            address[] rewardTokens;
            uint256[] rewardAmounts;
            uint256 expiryTime;
            bool hasBeenWithdrawn;
            bytes32 nonce;
            address prover;
        }

        error CalldataMismatch();
        error RewardsMismatch();
        error ExpiryTooSoon();
        error UnauthorizedWithdrawal(bytes32 _hash);
        error NothingToWithdraw(bytes32 _hash);

        event IntentCreated(
            bytes32 indexed _hash,
            address _creator,
            uint256 indexed _destinationChain,
            address[] _targets,
            bytes[] _data,
            address[] _rewardTokens,
            uint256[] _rewardAmounts,
            uint256 indexed _expiryTime,
            bytes32 nonce
        );
        event Withdrawal(bytes32 _hash, address indexed _recipient);

        function createIntent(
            uint256 _destinationChainID,
            address _inbox,
            address[] calldata _targets,
            bytes[] calldata _data,
            address[] calldata _rewardTokens,
            uint256[] calldata _rewardAmounts,
            uint256 _expiryTime,
            address _prover
        ) external;
        function withdrawRewards(bytes32 _hash) external;
        function getIntent(bytes32 identifier) external view returns (Intent memory);
        function counter() external view returns (uint256);
        function MINIMUM_DURATION() external view returns (uint256);
    }

    #[sol(rpc)]
    contract Inbox {
        error IntentExpired();
        error InvalidHash(bytes32 _expectedHash);
        error IntentAlreadyFulfilled(bytes32 _hash);
        error IntentCallFailed(address _addr, bytes _data, bytes _returnData);
        error ZeroClaimant();

        event Fulfillment(bytes32 indexed _hash, uint256 indexed _sourceChainID, address indexed _claimant);

        function fulfill(
            uint256 _sourceChainID,
            address[] calldata _targets,
            bytes[] calldata _data,
            uint256 _expiryTime,
            bytes32 _nonce,
            address _claimant,
            bytes32 _expectedHash
        ) external returns (bytes[] memory);
        function fulfilled(bytes32 _hash) external view returns (address);
    }

    #[sol(rpc)]
    contract Prover {
        struct DisputeGameFactoryProofData {
            bytes32 messagePasserStateRoot;
            bytes32 latestBlockHash;
            uint256 gameIndex;
            bytes32 gameId;
            bytes[] disputeFaultGameStorageProof;
            bytes rlpEncodedDisputeGameFactoryData;
            bytes[] disputeGameFactoryAccountProof;
        }

        struct FaultDisputeGameStatusSlotData {
            uint64 createdAt;
            uint64 resolvedAt;
            uint8 gameStatus;
            bool initialized;
            bool l2BlockNumberChallenged;
        }

        struct FaultDisputeGameProofData {
            bytes32 faultDisputeGameStateRoot;
            bytes[] faultDisputeGameRootClaimStorageProof;
            FaultDisputeGameStatusSlotData faultDisputeGameStatusSlotData;
            bytes[] faultDisputeGameStatusStorageProof;
            bytes rlpEncodedFaultDisputeGameData;
            bytes[] faultDisputeGameAccountProof;
        }

        error InvalidRLPEncodedBlock(bytes32 _expectedBlockHash, bytes32 _calculatedBlockHash);
        error SettlementChainStateRootNotProved(bytes32 _blockProofStateRoot, bytes32 _l1WorldStateRoot);
        error DestinationChainStateRootNotProved(bytes32 _blockProofStateRoot, bytes32 _l2WorldStateRoot);
        error BlockNumberTooLow(uint256 _inputBlockNumber, uint256 _latestBlockNumber);
        error InvalidStorageProof();
        error InvalidAccountProof();
        error FaultDisputeGameUnresolved(uint8 _gameStatus);
        error ChainNotConfigured(uint256 _chainId);
        error IntentAlreadyProven(bytes32 _hash, address _claimant);

        event L1WorldStateProven(uint256 indexed _blocknumber, bytes32 _L1WorldStateRoot);
        event L2WorldStateProven(uint256 indexed _destinationChainID, uint256 indexed _blockNumber, bytes32 _L2WorldStateRoot);
        event IntentProven(bytes32 indexed _hash, address indexed _claimant);

        function proveSettlementLayerState(bytes calldata rlpEncodedBlockData) external;
        function proveWorldStateBedrock(
            uint256 chainId,
            bytes calldata rlpEncodedBlockData,
            bytes32 l2WorldStateRoot,
            bytes32 l2MessagePasserStateRoot,
            uint256 l2OutputIndex,
            bytes[] calldata l1StorageProof,
            bytes calldata rlpEncodedOutputOracleData,
            bytes[] calldata l1AccountProof,
            bytes32 l1WorldStateRoot
        ) external;
        function proveWorldStateCannon(
            uint256 chainId,
            bytes calldata rlpEncodedBlockData,
            bytes32 l2WorldStateRoot,
            DisputeGameFactoryProofData calldata disputeGameFactoryProofData,
            FaultDisputeGameProofData memory faultDisputeGameProofData,
            bytes32 l1WorldStateRoot
        ) external;
        function proveIntent(
            uint256 chainId,
            address claimant,
            address inboxContract,
            bytes32 intermediateHash,
            bytes[] calldata l2StorageProof,
            bytes calldata rlpEncodedInboxData,
            bytes[] calldata l2AccountProof,
            bytes32 l2WorldStateRoot
        ) external;
        function provenIntents(bytes32 _hash) external view returns (address);
        function provenStates(uint256 _chainId) external view returns (uint256 blockNumber, bytes32 blockHash, bytes32 stateRoot);
        function chainConfigurations(uint256 _chainId) external view returns (
            uint8 provingMechanism,
            uint256 settlementChainId,
            address settlementContract,
            address blockhashOracle,
            bytes32 outputRootVersionNumber
        );
    }

    #[sol(rpc)]
    interface IL1Block {
        function number() external view returns (uint64);
        function hash() external view returns (bytes32);
    }

    #[sol(rpc)]
    interface IL2OutputOracle {
        #[derive(Debug)]
        struct OutputProposal {
            bytes32 outputRoot;
            uint128 timestamp;
            uint128 l2BlockNumber;
        }

        function latestBlockNumber() external view returns (uint256);
        function getL2OutputIndexAfter(uint256 _l2BlockNumber) external view returns (uint256);
        function getL2Output(uint256 _l2OutputIndex) external view returns (OutputProposal memory);
    }

    #[sol(rpc)]
    interface IDisputeGameFactory {
        #[derive(Debug)]
        struct GameSearchResult {
            uint256 index;
            bytes32 metadata;
            uint64 timestamp;
            bytes32 rootClaim;
            bytes extraData;
        }

        function gameCount() external view returns (uint256 gameCount_);
        function findLatestGames(uint32 _gameType, uint256 _start, uint256 _n)
            external view returns (GameSearchResult[] memory games_);
    }
}
