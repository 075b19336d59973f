//! Contract calls as seen by this crate: something that encodes to calldata and,
//! for reads, decodes the returned bytes.

use anyhow::Result;

/// A contract function invocation with its arguments bound.
pub trait ContractFunction: Send + Sync {
    fn encode(&self) -> Result<Vec<u8>>;
}

/// A read-only contract function with a typed return value.
pub trait ContractQuery: ContractFunction {
    type Output: Default + PartialEq + Send + Sync + 'static;

    fn decode(&self, data: &[u8]) -> Result<Self::Output>;

    /// Whether a successfully decoded value carries no information.
    ///
    /// ABI decoding of an empty or missing return produces the default value, so
    /// a default output cannot be told apart from a call to a function the
    /// contract does not have.
    fn is_inconclusive(&self, output: &Self::Output) -> bool {
        *output == Self::Output::default()
    }
}

#[cfg(feature = "web3_")]
pub use self::ethabi_calls::{AbiFunction, AbiQuery};

#[cfg(feature = "web3_")]
mod ethabi_calls {
    use super::{ContractFunction, ContractQuery};
    use anyhow::{anyhow, Context, Result};
    use std::marker::PhantomData;
    use web3::{
        contract::tokens::{Detokenize, Tokenize},
        ethabi::{Contract, Function, Token},
    };

    /// A function from a loaded ABI together with its arguments.
    #[derive(Clone, Debug)]
    pub struct AbiFunction {
        function: Function,
        params: Vec<Token>,
    }

    impl AbiFunction {
        pub fn new(contract: &Contract, name: &str, params: impl Tokenize) -> Result<Self> {
            let function = contract
                .function(name)
                .with_context(|| format!("contract has no function {}", name))?
                .clone();
            Ok(Self {
                function,
                params: params.into_tokens(),
            })
        }

        pub fn name(&self) -> &str {
            &self.function.name
        }
    }

    impl ContractFunction for AbiFunction {
        fn encode(&self) -> Result<Vec<u8>> {
            self.function
                .encode_input(&self.params)
                .with_context(|| format!("failed to encode {} call", self.function.name))
        }
    }

    /// An [`AbiFunction`] whose output decodes into `O`.
    #[derive(Clone, Debug)]
    pub struct AbiQuery<O> {
        function: AbiFunction,
        output: PhantomData<fn() -> O>,
    }

    impl<O> AbiQuery<O> {
        pub fn new(contract: &Contract, name: &str, params: impl Tokenize) -> Result<Self> {
            Ok(Self {
                function: AbiFunction::new(contract, name, params)?,
                output: PhantomData,
            })
        }
    }

    impl<O> ContractFunction for AbiQuery<O> {
        fn encode(&self) -> Result<Vec<u8>> {
            self.function.encode()
        }
    }

    impl<O> ContractQuery for AbiQuery<O>
    where
        O: Detokenize + Default + PartialEq + Send + Sync + 'static,
    {
        type Output = O;

        fn decode(&self, data: &[u8]) -> Result<O> {
            let tokens = self
                .function
                .function
                .decode_output(data)
                .with_context(|| format!("failed to decode {} output", self.function.name()))?;
            O::from_tokens(tokens).map_err(|err| anyhow!("{}: {}", self.function.name(), err))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use primitive_types::{H160, U256};

        const ERC20_BALANCE_OF: &str = r#"[{
            "constant": true,
            "inputs": [{"name": "owner", "type": "address"}],
            "name": "balanceOf",
            "outputs": [{"name": "balance", "type": "uint256"}],
            "payable": false,
            "stateMutability": "view",
            "type": "function"
        }]"#;

        fn contract() -> Contract {
            Contract::load(ERC20_BALANCE_OF.as_bytes()).unwrap()
        }

        #[test]
        fn encodes_selector_and_argument() {
            let query = AbiQuery::<U256>::new(&contract(), "balanceOf", H160::repeat_byte(1)).unwrap();
            let data = query.encode().unwrap();
            assert_eq!(data.len(), 4 + 32);
            assert_eq!(&data[..4], &[0x70, 0xa0, 0x82, 0x31]);
            assert_eq!(&data[16..], H160::repeat_byte(1).as_bytes());
        }

        #[test]
        fn decodes_output() {
            let query = AbiQuery::<U256>::new(&contract(), "balanceOf", H160::zero()).unwrap();
            let mut data = [0u8; 32];
            data[31] = 7;
            let balance = query.decode(&data).unwrap();
            assert_eq!(balance, U256::from(7));
            assert!(!query.is_inconclusive(&balance));
        }

        #[test]
        fn zero_output_is_inconclusive() {
            let query = AbiQuery::<U256>::new(&contract(), "balanceOf", H160::zero()).unwrap();
            let balance = query.decode(&[0u8; 32]).unwrap();
            assert!(query.is_inconclusive(&balance));
        }

        #[test]
        fn unknown_function() {
            assert!(AbiFunction::new(&contract(), "totalSupply", H160::zero()).is_err());
        }
    }
}
