//! ABI dispatch: from raw call data to a method and its decoded arguments.
//!
//! An [`AbiSchema`] is built once from a JSON ABI document and never mutated.
//! [`dispatch`] resolves call data against it:
//!
//! 1. empty call data goes to `receive` when value is attached and `receive`
//!    exists, otherwise to `fallback`, otherwise reverts
//! 2. one to three bytes go to `fallback`, otherwise revert
//! 3. four or more bytes are looked up by selector; a miss goes to `fallback`
//!    when present, otherwise the lookup error is returned as-is
//! 4. a state-mutating method under a read-only call is refused
//! 5. functions have the remaining bytes decoded against their inputs
//!
//! A [`BoundSchema`] additionally ties every function in the ABI to a variant
//! of a caller-defined [`MethodId`] enum, so handlers match on a closed set of
//! operations instead of on strings.

use std::collections::BTreeMap;
use std::fmt;

use alloy_dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy_json_abi::{Function, JsonAbi, StateMutability};
use tessera_primitives::{Selector, U256};
use tracing::debug;

use crate::error::BridgeError;

/// Length of a function selector.
pub const SELECTOR_LEN: usize = 4;

/// Failure building or binding a schema table.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("malformed ABI document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("selector {selector} is claimed by both {first} and {second}")]
    DuplicateSelector {
        selector: Selector,
        first: String,
        second: String,
    },

    #[error("ABI function {0} has no operation id")]
    UnknownMethod(String),

    #[error("operation {0} is not in the ABI")]
    MissingMethod(&'static str),

    #[error("cannot encode call to {method}: {reason}")]
    Encode { method: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    Function,
    Fallback,
    Receive,
}

/// One entry of the schema table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub name: String,
    /// `None` for fallback and receive.
    pub selector: Option<Selector>,
    pub kind: MethodKind,
    pub state_mutability: StateMutability,
    /// Argument and return schema; `None` for fallback and receive.
    pub function: Option<Function>,
}

impl MethodDescriptor {
    fn from_function(function: &Function) -> Self {
        Self {
            name: function.name.clone(),
            selector: Some(function.selector()),
            kind: MethodKind::Function,
            state_mutability: function.state_mutability,
            function: Some(function.clone()),
        }
    }

    fn special(kind: MethodKind, state_mutability: StateMutability) -> Self {
        let name = match kind {
            MethodKind::Receive => "receive",
            _ => "fallback",
        };
        Self {
            name: name.to_string(),
            selector: None,
            kind,
            state_mutability,
            function: None,
        }
    }

    /// Default mutating predicate: `nonpayable` and `payable` mutate state,
    /// `view` and `pure` do not.
    pub fn is_state_mutating(&self) -> bool {
        matches!(
            self.state_mutability,
            StateMutability::NonPayable | StateMutability::Payable
        )
    }

    /// Selector-prefixed call data for this function.
    pub fn encode_call(&self, args: &[DynSolValue]) -> Result<Vec<u8>, SchemaError> {
        let function = self.function.as_ref().ok_or_else(|| SchemaError::Encode {
            method: self.name.clone(),
            reason: "not a function".into(),
        })?;
        function
            .abi_encode_input(args)
            .map_err(|e| SchemaError::Encode {
                method: self.name.clone(),
                reason: e.to_string(),
            })
    }

    /// Decode the argument bytes that follow the selector.
    pub fn decode_args(&self, data: &[u8]) -> Result<Vec<DynSolValue>, BridgeError> {
        match &self.function {
            Some(function) => {
                function
                    .abi_decode_input(data)
                    .map_err(|e| BridgeError::ArgumentDecoding {
                        method: self.name.clone(),
                        reason: e.to_string(),
                    })
            }
            None => Ok(Vec::new()),
        }
    }

    /// Pack return values against the method's output schema.
    ///
    /// Fallback and receive have no return schema and produce empty output.
    pub fn encode_output(&self, values: &[DynSolValue]) -> Result<Vec<u8>, BridgeError> {
        match &self.function {
            Some(function) => {
                function
                    .abi_encode_output(values)
                    .map_err(|e| BridgeError::OutputEncoding {
                        method: self.name.clone(),
                        reason: e.to_string(),
                    })
            }
            None => Ok(Vec::new()),
        }
    }
}

/// Immutable table of the methods a precompile exposes.
#[derive(Debug, Clone, Default)]
pub struct AbiSchema {
    methods: BTreeMap<Selector, MethodDescriptor>,
    fallback: Option<MethodDescriptor>,
    receive: Option<MethodDescriptor>,
}

impl AbiSchema {
    /// Build the table from a JSON ABI document.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let abi: JsonAbi = serde_json::from_str(json)?;
        Self::from_abi(&abi)
    }

    pub fn from_abi(abi: &JsonAbi) -> Result<Self, SchemaError> {
        let mut methods: BTreeMap<Selector, MethodDescriptor> = BTreeMap::new();
        for function in abi.functions() {
            let descriptor = MethodDescriptor::from_function(function);
            let selector = function.selector();
            if let Some(existing) = methods.get(&selector) {
                return Err(SchemaError::DuplicateSelector {
                    selector,
                    first: existing.name.clone(),
                    second: descriptor.name,
                });
            }
            methods.insert(selector, descriptor);
        }
        Ok(Self {
            methods,
            fallback: abi
                .fallback
                .as_ref()
                .map(|f| MethodDescriptor::special(MethodKind::Fallback, f.state_mutability)),
            receive: abi
                .receive
                .as_ref()
                .map(|r| MethodDescriptor::special(MethodKind::Receive, r.state_mutability)),
        })
    }

    /// First function named `name`.
    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.values().find(|m| m.name == name)
    }

    pub fn by_selector(&self, selector: &Selector) -> Option<&MethodDescriptor> {
        self.methods.get(selector)
    }

    pub fn fallback(&self) -> Option<&MethodDescriptor> {
        self.fallback.as_ref()
    }

    pub fn receive(&self) -> Option<&MethodDescriptor> {
        self.receive.as_ref()
    }

    /// Functions in selector order.
    pub fn functions(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.methods.values()
    }
}

/// Resolve call data to a method and decode its arguments.
///
/// Pure: reads nothing but its inputs.
pub fn dispatch<'a, F>(
    call_data: &[u8],
    value: U256,
    schema: &'a AbiSchema,
    read_only: bool,
    is_mutating: F,
) -> Result<(&'a MethodDescriptor, Vec<DynSolValue>), BridgeError>
where
    F: Fn(&MethodDescriptor) -> bool,
{
    let method = resolve(call_data, value, schema)?;

    if read_only && is_mutating(method) {
        return Err(BridgeError::WriteProtection);
    }

    let args = match method.kind {
        MethodKind::Function => method.decode_args(&call_data[SELECTOR_LEN..])?,
        MethodKind::Fallback | MethodKind::Receive => Vec::new(),
    };
    Ok((method, args))
}

fn resolve<'a>(
    call_data: &[u8],
    value: U256,
    schema: &'a AbiSchema,
) -> Result<&'a MethodDescriptor, BridgeError> {
    match call_data.len() {
        0 => {
            if !value.is_zero() {
                if let Some(receive) = schema.receive() {
                    return Ok(receive);
                }
            }
            schema.fallback().ok_or(BridgeError::ExecutionReverted)
        }
        1..=3 => schema.fallback().ok_or(BridgeError::ExecutionReverted),
        _ => {
            let selector = Selector::from_slice(&call_data[..SELECTOR_LEN]);
            match schema.by_selector(&selector) {
                Some(method) => Ok(method),
                None => match schema.fallback() {
                    Some(fallback) => {
                        debug!(%selector, "abi: unknown selector routed to fallback");
                        Ok(fallback)
                    }
                    None => Err(BridgeError::UnknownSelector(selector)),
                },
            }
        }
    }
}

/// Closed set of operations a handler implements.
///
/// Usually a fieldless enum whose variants name the ABI's functions.
pub trait MethodId: Copy + Eq + fmt::Debug + 'static {
    /// Every variant.
    const ALL: &'static [Self];

    /// ABI function name of this operation.
    fn name(&self) -> &'static str;

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.name() == name)
    }
}

/// A dispatched call on a [`BoundSchema`].
#[derive(Debug)]
pub struct DispatchedCall<'a, M> {
    pub method: &'a MethodDescriptor,
    /// `None` when the call went to fallback or receive.
    pub op: Option<M>,
    pub args: Vec<DynSolValue>,
}

/// Schema table whose functions are bound one-to-one to `M`'s variants.
#[derive(Debug, Clone)]
pub struct BoundSchema<M> {
    schema: AbiSchema,
    ops: BTreeMap<Selector, M>,
}

impl<M: MethodId> BoundSchema<M> {
    /// Bind `schema` to `M`. Fails unless every ABI function has a variant and
    /// every variant has an ABI function.
    pub fn bind(schema: AbiSchema) -> Result<Self, SchemaError> {
        let mut ops = BTreeMap::new();
        for (selector, method) in &schema.methods {
            let op = M::from_name(&method.name)
                .ok_or_else(|| SchemaError::UnknownMethod(method.name.clone()))?;
            ops.insert(*selector, op);
        }
        for op in M::ALL {
            if !ops.values().any(|bound| bound == op) {
                return Err(SchemaError::MissingMethod(op.name()));
            }
        }
        Ok(Self { schema, ops })
    }

    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        Self::bind(AbiSchema::from_json(json)?)
    }

    pub fn schema(&self) -> &AbiSchema {
        &self.schema
    }

    /// Descriptor of the function bound to `op`.
    pub fn method(&self, op: M) -> Option<&MethodDescriptor> {
        self.ops
            .iter()
            .find(|(_, bound)| **bound == op)
            .and_then(|(selector, _)| self.schema.by_selector(selector))
    }

    /// [`dispatch`] that also reports the operation tag.
    pub fn dispatch<F>(
        &self,
        call_data: &[u8],
        value: U256,
        read_only: bool,
        is_mutating: F,
    ) -> Result<DispatchedCall<'_, M>, BridgeError>
    where
        F: Fn(&MethodDescriptor) -> bool,
    {
        let (method, args) = dispatch(call_data, value, &self.schema, read_only, is_mutating)?;
        let op = method
            .selector
            .and_then(|selector| self.ops.get(&selector).copied());
        Ok(DispatchedCall { method, op, args })
    }
}
