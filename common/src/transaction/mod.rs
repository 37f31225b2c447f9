use crate::{
    authority::RequiredAuthorities,
    config::{MAX_OPERATIONS_PER_TRANSACTION, MAX_TRANSACTION_SIZE},
    crypto::{hash, hash_parts, Hash, Hashable, KeyPair, PublicKey, Signature},
    error::{AuthorityError, ValidationError},
    operation::Operation,
    serializer::Serializer,
    time::TimestampSeconds,
};
use log::trace;
use serde::{Deserialize, Serialize};

/// Ordered list of operations, bound to a recent block and an expiration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    // Low 16 bits of a recent block number
    pub ref_block_num: u16,
    // Bytes 4..8 of that block id, little-endian
    pub ref_block_prefix: u32,
    pub expiration: TimestampSeconds,
    pub operations: Vec<Operation>,
}

impl_serializer!(Transaction {
    ref_block_num,
    ref_block_prefix,
    expiration,
    operations
});

impl Hashable for Transaction {}

/// Reference fields of a block id as stored in transactions.
pub fn reference_of(block_id: &Hash) -> (u16, u32) {
    let bytes = block_id.as_bytes();
    let num = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let prefix = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    ((num & 0xffff) as u16, prefix)
}

impl Transaction {
    pub fn new(expiration: TimestampSeconds) -> Self {
        Self {
            ref_block_num: 0,
            ref_block_prefix: 0,
            expiration,
            operations: Vec::new(),
        }
    }

    pub fn with_operation<O: Into<Operation>>(mut self, op: O) -> Self {
        self.operations.push(op.into());
        self
    }

    pub fn push_operation<O: Into<Operation>>(&mut self, op: O) {
        self.operations.push(op.into());
    }

    // Bind the transaction to a block it can only be applied on top of
    pub fn set_reference_block(&mut self, block_id: &Hash) {
        let (num, prefix) = reference_of(block_id);
        self.ref_block_num = num;
        self.ref_block_prefix = prefix;
    }

    pub fn has_reference_block(&self) -> bool {
        self.ref_block_num != 0 || self.ref_block_prefix != 0
    }

    /// Transaction id, independent of signatures.
    pub fn id(&self) -> Hash {
        self.hash()
    }

    /// Message signed by every authority of the transaction.
    pub fn digest(&self, chain_id: &Hash) -> Hash {
        hash_parts(&[chain_id.as_bytes(), &self.to_bytes()])
    }

    /// Structural checks, no chain state involved.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.operations.is_empty() {
            return Err(ValidationError::EmptyTransaction);
        }
        if self.operations.len() > MAX_OPERATIONS_PER_TRANSACTION {
            return Err(ValidationError::TooManyOperations(self.operations.len()));
        }

        for (index, op) in self.operations.iter().enumerate() {
            op.validate().map_err(|e| ValidationError::Operation {
                index,
                source: Box::new(e),
            })?;
        }
        Ok(())
    }

    pub fn required_authorities(&self) -> RequiredAuthorities {
        let mut required = RequiredAuthorities::new();
        for op in &self.operations {
            op.required_authorities(&mut required);
        }
        required
    }
}

/// Signature with the key that produced it.
///
/// Ed25519 keys cannot be recovered from signatures, so the signer travels
/// along and is checked against the authorities.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEntry {
    pub signer: PublicKey,
    pub signature: Signature,
}

impl_serializer!(SignatureEntry { signer, signature });

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub signatures: Vec<SignatureEntry>,
}

impl_serializer!(SignedTransaction {
    transaction,
    signatures
});

impl SignedTransaction {
    pub fn new(transaction: Transaction) -> Self {
        Self {
            transaction,
            signatures: Vec::new(),
        }
    }

    pub fn id(&self) -> Hash {
        self.transaction.id()
    }

    // Hash of the full transaction including signatures, used as merkle leaf
    pub fn merkle_digest(&self) -> Hash {
        hash(&self.to_bytes())
    }

    pub fn sign(&mut self, keypair: &KeyPair, chain_id: &Hash) -> &mut Self {
        let digest = self.transaction.digest(chain_id);
        self.signatures.push(SignatureEntry {
            signer: keypair.public_key(),
            signature: keypair.sign_hash(&digest),
        });
        self
    }

    pub fn signed(mut self, keypair: &KeyPair, chain_id: &Hash) -> Self {
        self.sign(keypair, chain_id);
        self
    }

    /// Signer keys, in signature order, without verification.
    pub fn signer_keys(&self) -> Vec<PublicKey> {
        self.signatures.iter().map(|entry| entry.signer).collect()
    }

    /// Verify every signature and return the signer keys.
    pub fn verify_signatures(&self, chain_id: &Hash) -> Result<Vec<PublicKey>, AuthorityError> {
        let digest = self.transaction.digest(chain_id);
        for entry in &self.signatures {
            if entry
                .signer
                .verify(digest.as_bytes(), &entry.signature)
                .is_err()
            {
                trace!("invalid signature of {} on tx {}", entry.signer, self.id());
                return Err(AuthorityError::InvalidSignature(entry.signer.to_hex()));
            }
        }
        Ok(self.signer_keys())
    }

    pub fn check_size(&self) -> Result<usize, ValidationError> {
        let size = self.size();
        if size > MAX_TRANSACTION_SIZE {
            return Err(ValidationError::TooLong {
                field: "transaction",
                size,
                max: MAX_TRANSACTION_SIZE,
            });
        }
        Ok(size)
    }
}

impl AsRef<Transaction> for SignedTransaction {
    fn as_ref(&self) -> &Transaction {
        &self.transaction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{asset::Asset, config::CHAIN_ID, operation::TransferOperation};

    fn transfer_tx() -> Transaction {
        Transaction::new(1_000).with_operation(TransferOperation {
            from: "alice".into(),
            to: "bob".into(),
            amount: Asset::coin(100),
            memo: String::new(),
        })
    }

    #[test]
    fn test_reference_block() {
        let mut bytes = [0u8; 32];
        bytes[..4].copy_from_slice(&0x0001_0203u32.to_be_bytes());
        bytes[4..8].copy_from_slice(&[0xaa, 0xbb, 0xcc, 0xdd]);
        let id = Hash::new(bytes);

        let mut tx = transfer_tx();
        tx.set_reference_block(&id);
        assert_eq!(tx.ref_block_num, 0x0203);
        assert_eq!(tx.ref_block_prefix, 0xddccbbaa);
        assert!(tx.has_reference_block());
    }

    #[test]
    fn test_signatures_do_not_change_id() {
        let tx = transfer_tx();
        let id = tx.id();
        let signed = SignedTransaction::new(tx).signed(&KeyPair::from_seed("alice_active"), &CHAIN_ID);
        assert_eq!(signed.id(), id);
        assert_ne!(signed.merkle_digest(), id);
    }

    #[test]
    fn test_verify_signatures() {
        let key = KeyPair::from_seed("alice_active");
        let mut signed = SignedTransaction::new(transfer_tx()).signed(&key, &CHAIN_ID);
        assert_eq!(signed.verify_signatures(&CHAIN_ID).unwrap(), vec![key.public_key()]);

        // Signature over another chain does not verify
        let other_chain = hash(b"other");
        assert!(matches!(
            signed.verify_signatures(&other_chain),
            Err(AuthorityError::InvalidSignature(_))
        ));

        signed.transaction.expiration += 1;
        assert!(signed.verify_signatures(&CHAIN_ID).is_err());
    }

    #[test]
    fn test_validate_reports_operation_index() {
        let mut tx = transfer_tx();
        tx.push_operation(TransferOperation {
            from: "alice".into(),
            to: "bob".into(),
            amount: Asset::coin(-5),
            memo: String::new(),
        });
        match tx.validate() {
            Err(ValidationError::Operation { index, .. }) => assert_eq!(index, 1),
            other => panic!("unexpected result {other:?}"),
        }

        assert_eq!(Transaction::new(0).validate(), Err(ValidationError::EmptyTransaction));
    }

    #[test]
    fn test_encoding_preserves_digest() {
        let signed = SignedTransaction::new(transfer_tx()).signed(&KeyPair::from_seed("k"), &CHAIN_ID);
        let decoded = SignedTransaction::from_bytes(&signed.to_bytes()).unwrap();
        assert_eq!(decoded.transaction.digest(&CHAIN_ID), signed.transaction.digest(&CHAIN_ID));

        let json = serde_json::to_string(&signed).unwrap();
        let from_json: SignedTransaction = serde_json::from_str(&json).unwrap();
        assert_eq!(from_json.merkle_digest(), signed.merkle_digest());
    }
}
