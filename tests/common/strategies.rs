use proptest::prelude::*;

use bridge_core::constants::result_codes;

/// Request token the picker is configured with in property tests
pub const PICKER_TOKEN: i32 = 1000;

/// One step of host/UI activity against a bridge
#[derive(Debug, Clone)]
pub enum BridgeOp {
    /// UI invokes `pick-image`
    Pick,
    /// Host reports a flow result
    FlowResult {
        token: i32,
        result_code: i32,
        payload: Option<String>,
    },
    /// UI invokes the synchronous socket warning
    Warn,
}

/// Tokens biased toward the picker token, with some foreign ones mixed in
pub fn token_strategy() -> impl Strategy<Value = i32> {
    prop_oneof![
        3 => Just(PICKER_TOKEN),
        1 => -5i32..5,
        1 => 1001i32..2000,
    ]
}

pub fn result_code_strategy() -> impl Strategy<Value = i32> {
    prop_oneof![
        Just(result_codes::RESULT_OK),
        Just(result_codes::RESULT_CANCELED),
        result_codes::RESULT_FIRST_USER..10,
    ]
}

pub fn payload_strategy() -> impl Strategy<Value = Option<String>> {
    prop::option::of("content://media/external/images/media/[0-9]{1,6}")
}

pub fn bridge_op_strategy() -> impl Strategy<Value = BridgeOp> {
    prop_oneof![
        2 => Just(BridgeOp::Pick),
        3 => (token_strategy(), result_code_strategy(), payload_strategy()).prop_map(
            |(token, result_code, payload)| BridgeOp::FlowResult {
                token,
                result_code,
                payload,
            }
        ),
        1 => Just(BridgeOp::Warn),
    ]
}

pub fn bridge_ops_strategy() -> impl Strategy<Value = Vec<BridgeOp>> {
    prop::collection::vec(bridge_op_strategy(), 0..40)
}
