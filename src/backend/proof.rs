//! Backend-native artifacts
//!
//! The pipeline never looks inside these; it stores and hands back the exact
//! bytes the backend produced.

macro_rules! native_artifact {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq)]
        pub struct $name(Vec<u8>);

        impl $name {
            pub fn from_bytes(bytes: Vec<u8>) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            pub fn into_bytes(self) -> Vec<u8> {
                self.0
            }

            pub fn len(&self) -> usize {
                self.0.len()
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }
    };
}

native_artifact!(
    /// Compiled outer circuit
    ConstraintSystem
);

native_artifact!(
    /// Key used to produce proofs for one constraint system
    ProvingKey
);

native_artifact!(
    /// Key used to check proofs for one constraint system
    VerifyingKey
);

native_artifact!(
    /// Outer proof, in the encoding an on-chain verifier accepts
    Proof
);
