use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("rig has no joints")]
    EmptyRig,

    #[error("duplicate joint name: {name}")]
    DuplicateJointName { name: String },

    #[error("joint '{joint}' references parent index {parent}, which is not an earlier joint")]
    InvalidJointParent { joint: String, parent: usize },

    #[error("rig has more than one root joint: '{first}' and '{second}'")]
    MultipleRoots { first: String, second: String },

    #[error("chain starting at joint '{base}' has {joints} joint(s); at least 2 are required")]
    ChainTooShort { base: String, joints: usize },

    #[error("unknown chain: {chain}")]
    UnknownChain { chain: String },

    #[error("chain '{chain}' is not a leaf chain and cannot take a target")]
    NotALeafChain { chain: String },

    #[error("leaf chain '{chain}' has no assigned target")]
    MissingTarget { chain: String },

    #[error("invalid value: {message}")]
    InvalidValue { message: String },
}
