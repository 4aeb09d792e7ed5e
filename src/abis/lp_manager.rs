use alloy::sol;

sol! {
    interface ILpManager {
        function fetchSpot(address token0, address token1, uint256 amountIn) external view returns (uint256);
        function fetchOracle(address token0, address token1, uint256 amountIn) external view returns (uint256);
    }
}
