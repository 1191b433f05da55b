use std::collections::BTreeMap;

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolInterface};
use intent_types::{LedgerResult, Reason};

use crate::bindings::IERC20::{self, IERC20Calls};

/// Balances and allowances of a fungible token.
#[derive(Clone, Debug, Default)]
pub(crate) struct Erc20 {
    balances: BTreeMap<Address, U256>,
    allowances: BTreeMap<(Address, Address), U256>,
}

impl Erc20 {
    pub(crate) fn balance_of(&self, owner: Address) -> U256 {
        self.balances.get(&owner).copied().unwrap_or_default()
    }

    pub(crate) fn mint(&mut self, to: Address, amount: U256) {
        let balance = self.balances.entry(to).or_default();
        *balance = balance.saturating_add(amount);
    }

    pub(crate) fn transfer(&mut self, token: Address, from: Address, to: Address, amount: U256) -> LedgerResult<()> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(Reason::InsufficientFunds {
                token,
                needed: amount,
                available,
            });
        }
        self.balances.insert(from, available - amount);
        self.mint(to, amount);
        Ok(())
    }

    pub(crate) fn approve(&mut self, owner: Address, spender: Address, amount: U256) {
        self.allowances.insert((owner, spender), amount);
    }

    pub(crate) fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> LedgerResult<()> {
        let allowance = self.allowances.get(&(from, spender)).copied().unwrap_or_default();
        if allowance < amount {
            return Err(Reason::InsufficientFunds {
                token,
                needed: amount,
                available: allowance,
            });
        }
        self.transfer(token, from, to, amount)?;
        self.allowances.insert((from, spender), allowance - amount);
        Ok(())
    }
}

/// Executes `data` against the token at `target` on behalf of `caller`.
pub(crate) fn execute_call(
    tokens: &mut BTreeMap<Address, Erc20>,
    caller: Address,
    target: Address,
    data: &[u8],
) -> Result<(), String> {
    let token = tokens.get_mut(&target).ok_or_else(|| format!("no contract at {target}"))?;
    let call = IERC20Calls::abi_decode(data).map_err(|err| err.to_string())?;
    match call {
        IERC20Calls::transfer(call) => token
            .transfer(target, caller, call.to, call.amount)
            .map_err(|err| err.to_string()),
        IERC20Calls::approve(call) => {
            token.approve(caller, call.spender, call.amount);
            Ok(())
        }
        IERC20Calls::transferFrom(call) => token
            .transfer_from(target, caller, call.from, call.to, call.amount)
            .map_err(|err| err.to_string()),
        IERC20Calls::balanceOf(_) => Ok(()),
    }
}

/// Calldata of `transfer(to, amount)`, the usual intent call.
pub fn transfer_calldata(to: Address, amount: U256) -> Bytes {
    IERC20::transferCall { to, amount }.abi_encode().into()
}
