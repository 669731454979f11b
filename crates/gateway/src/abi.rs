//! Solidity interfaces the gateway speaks.

use alloy_sol_types::sol;

sol! {
    /// Off-chain resolver service: the call an `OffchainLookup` revert
    /// asks the client to send to the gateway.
    interface IResolverService {
        function resolve(bytes name, bytes data)
            external
            view
            returns (bytes result, uint64 expires, bytes sig);
    }

    /// EIP-137 address resolver.
    interface IAddrResolver {
        function addr(bytes32 node) external view returns (address);
    }

    /// EIP-2304 multi-coin address resolver.
    interface IAddressResolver {
        function addr(bytes32 node, uint256 coinType) external view returns (bytes);
    }

    /// EIP-634 text record resolver.
    interface ITextResolver {
        function text(bytes32 node, string key) external view returns (string);
    }

    /// EIP-1577 content hash resolver.
    interface IContentHashResolver {
        function contenthash(bytes32 node) external view returns (bytes);
    }
}
