//! ABI surface of the token service.
//!
//! Selectors are derived from these signatures and must stay bit-exact with
//! the deployed protocol; struct layouts are part of that contract.

use alloy_sol_types::sol;

/// `redirectForToken(address,bytes)`. A call to a token's own address is
/// re-dispatched to the service as
/// `[REDIRECT_FOR_TOKEN][20-byte token][nested selector][args]`.
pub const REDIRECT_FOR_TOKEN: [u8; 4] = [0x61, 0x8d, 0xc6, 0x5e];

/// Length of the redirect header: selector plus token address.
pub const REDIRECT_HEADER_LEN: usize = 4 + 20;

sol! {
    /// Protocol-native token service, called at the service address.
    #[sol(all_derives)]
    interface IHederaTokenService {
        struct AccountAmount {
            address accountID;
            int64 amount;
        }

        struct NftTransfer {
            address senderAccountID;
            address receiverAccountID;
            int64 serialNumber;
        }

        struct TokenTransferList {
            address token;
            AccountAmount[] transfers;
            NftTransfer[] nftTransfers;
        }

        struct KeyValue {
            bool inheritAccountKey;
            address contractId;
            bytes ed25519;
            bytes ECDSA_secp256k1;
            address delegatableContractId;
        }

        struct TokenKey {
            uint256 keyType;
            KeyValue key;
        }

        struct Expiry {
            uint32 second;
            address autoRenewAccount;
            uint32 autoRenewPeriod;
        }

        struct HederaToken {
            string name;
            string symbol;
            address treasury;
            string memo;
            bool tokenSupplyType;
            uint32 maxSupply;
            bool freezeDefault;
            TokenKey[] tokenKeys;
            Expiry expiry;
        }

        struct FixedFee {
            int64 amount;
            address tokenId;
            bool useHbarsForPayment;
            bool useCurrentTokenForPayment;
            address feeCollector;
        }

        struct FractionalFee {
            int64 numerator;
            int64 denominator;
            int64 minimumAmount;
            int64 maximumAmount;
            bool netOfTransfers;
            address feeCollector;
        }

        struct RoyaltyFee {
            int64 numerator;
            int64 denominator;
            int64 amount;
            address tokenId;
            bool useHbarsForPayment;
            address feeCollector;
        }

        struct TokenInfo {
            HederaToken token;
            int64 totalSupply;
            bool deleted;
            bool defaultKycStatus;
            bool pauseStatus;
            FixedFee[] fixedFees;
            FractionalFee[] fractionalFees;
            RoyaltyFee[] royaltyFees;
            string ledgerId;
        }

        function cryptoTransfer(TokenTransferList[] tokenTransfers) external returns (int64 responseCode);
        function transferTokens(address token, address[] accountId, int64[] amount) external returns (int64 responseCode);
        function transferToken(address token, address sender, address recipient, int64 amount) external returns (int64 responseCode);
        function transferNFTs(address token, address[] sender, address[] receiver, int64[] serialNumber) external returns (int64 responseCode);
        function transferNFT(address token, address sender, address recipient, int64 serialNumber) external returns (int64 responseCode);
        function transferFrom(address token, address from, address to, uint256 amount) external returns (int64 responseCode);
        function transferFromNFT(address token, address from, address to, uint256 serialNumber) external returns (int64 responseCode);

        function mintToken(address token, uint64 amount, bytes[] metadata) external returns (int64 responseCode, uint64 newTotalSupply, int64[] serialNumbers);
        function burnToken(address token, uint64 amount, int64[] serialNumbers) external returns (int64 responseCode, uint64 newTotalSupply);
        function wipeTokenAccount(address token, address account, uint32 amount) external returns (int64 responseCode);
        function wipeTokenAccount(address token, address account, int64 amount) external returns (int64 responseCode);
        function wipeTokenAccountNFT(address token, address account, int64[] serialNumbers) external returns (int64 responseCode);

        function associateTokens(address account, address[] tokens) external returns (int64 responseCode);
        function associateToken(address account, address token) external returns (int64 responseCode);
        function dissociateTokens(address account, address[] tokens) external returns (int64 responseCode);
        function dissociateToken(address account, address token) external returns (int64 responseCode);

        function approve(address token, address spender, uint256 amount) external returns (int64 responseCode);
        function approveNFT(address token, address approved, uint256 serialNumber) external returns (int64 responseCode);
        function setApprovalForAll(address token, address operator, bool approved) external returns (int64 responseCode);
        function allowance(address token, address owner, address spender) external returns (int64 responseCode, uint256 allowance);
        function getApproved(address token, uint256 serialNumber) external returns (int64 responseCode, address approved);
        function isApprovedForAll(address token, address owner, address operator) external returns (int64 responseCode, bool approved);

        function createFungibleToken(HederaToken token, uint256 initialTotalSupply, uint256 decimals) external payable returns (int64 responseCode, address tokenAddress);
        function createFungibleTokenWithCustomFees(HederaToken token, uint256 initialTotalSupply, uint256 decimals, FixedFee[] fixedFees, FractionalFee[] fractionalFees) external payable returns (int64 responseCode, address tokenAddress);
        function createNonFungibleToken(HederaToken token) external payable returns (int64 responseCode, address tokenAddress);
        function createNonFungibleTokenWithCustomFees(HederaToken token, FixedFee[] fixedFees, RoyaltyFee[] royaltyFees) external payable returns (int64 responseCode, address tokenAddress);
        function updateTokenInfo(address token, HederaToken tokenInfo) external returns (int64 responseCode);

        function pauseToken(address token) external returns (int64 responseCode);
        function unpauseToken(address token) external returns (int64 responseCode);
        function freezeToken(address token, address account) external returns (int64 responseCode);
        function unfreezeToken(address token, address account) external returns (int64 responseCode);
        function grantTokenKyc(address token, address account) external returns (int64 responseCode);
        function revokeTokenKyc(address token, address account) external returns (int64 responseCode);
        function deleteToken(address token) external returns (int64 responseCode);

        function isToken(address token) external returns (int64 responseCode, bool isToken);
        function getTokenType(address token) external returns (int64 responseCode, int32 tokenType);
        function getTokenKey(address token, uint256 keyType) external returns (int64 responseCode, KeyValue key);
        function getTokenInfo(address token) external returns (int64 responseCode, TokenInfo tokenInfo);
        function getTokenCustomFees(address token) external returns (int64 responseCode, FixedFee[] fixedFees, FractionalFee[] fractionalFees, RoyaltyFee[] royaltyFees);
        function getTokenDefaultKycStatus(address token) external returns (int64 responseCode, bool defaultKycStatus);
        function getTokenDefaultFreezeStatus(address token) external returns (int64 responseCode, bool defaultFreezeStatus);
        function getTokenExpiryInfo(address token) external returns (int64 responseCode, Expiry expiry);
        function isFrozen(address token, address account) external returns (int64 responseCode, bool frozen);
        function isKyc(address token, address account) external returns (int64 responseCode, bool kycGranted);
    }
}

sol! {
    /// ERC-20 and ERC-721 forms reachable through the token-proxy redirect.
    #[sol(all_derives)]
    interface ITokenProxy {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function ownerOf(uint256 tokenId) external view returns (address);
        function tokenURI(uint256 tokenId) external view returns (string);
        function transfer(address recipient, uint256 amount) external returns (bool);
        function transferFrom(address sender, address recipient, uint256 amount) external returns (bool);
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function getApproved(uint256 tokenId) external view returns (address);
        function setApprovalForAll(address operator, bool approved) external;
        function isApprovedForAll(address owner, address operator) external view returns (bool);
    }
}

#[cfg(test)]
mod tests {
    use super::{IHederaTokenService as Hts, ITokenProxy as Erc};
    use alloy_primitives::keccak256;
    use alloy_sol_types::SolCall;

    #[test]
    fn protocol_selectors_are_stable() {
        assert_eq!(Hts::associateTokenCall::SELECTOR, [0x49, 0x14, 0x6b, 0xde]);
        assert_eq!(Hts::dissociateTokenCall::SELECTOR, [0x09, 0x97, 0x94, 0xe8]);
        assert_eq!(Hts::approveNFTCall::SELECTOR, [0x73, 0x36, 0xaa, 0xf0]);
    }

    #[test]
    fn wipe_overloads_keep_distinct_selectors() {
        let selector = |signature: &str| keccak256(signature)[..4].to_vec();
        assert_eq!(
            Hts::wipeTokenAccount_0Call::SELECTOR.to_vec(),
            selector("wipeTokenAccount(address,address,uint32)")
        );
        assert_eq!(
            Hts::wipeTokenAccount_1Call::SELECTOR.to_vec(),
            selector("wipeTokenAccount(address,address,int64)")
        );
        assert_eq!(
            Hts::wipeTokenAccountNFTCall::SELECTOR.to_vec(),
            selector("wipeTokenAccountNFT(address,address,int64[])")
        );
    }

    #[test]
    fn proxy_selectors_match_erc_standards() {
        assert_eq!(Erc::approveCall::SELECTOR, [0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(Erc::isApprovedForAllCall::SELECTOR, [0xe9, 0x85, 0xe9, 0xc5]);
        assert_eq!(Erc::setApprovalForAllCall::SELECTOR, [0xa2, 0x2c, 0xb4, 0x65]);
        assert_eq!(Erc::getApprovedCall::SELECTOR, [0x08, 0x18, 0x12, 0xfc]);
        assert_eq!(Erc::balanceOfCall::SELECTOR, [0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(Erc::ownerOfCall::SELECTOR, [0x63, 0x52, 0x21, 0x1e]);
        assert_eq!(Erc::transferFromCall::SELECTOR, [0x23, 0xb8, 0x72, 0xdd]);
    }
}
