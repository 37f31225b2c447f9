use super::Evaluator;
use crate::core::{database::Database, error::BlockchainError, objects::ProducerObject};
use ezira_common::operation::ProducerUpdateOperation;
use log::info;

impl Evaluator for ProducerUpdateOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        let now = db.head_block_time()?;
        db.get_account(&self.owner)?;

        match db.find_producer(&self.owner).map(|producer| producer.id) {
            Some(id) => {
                db.store_mut().modify::<ProducerObject, _>(id, |producer| {
                    producer.signing_key = self.signing_key;
                    producer.url = self.url.clone();
                    producer.active = self.active;
                })?;
            }
            None => {
                db.store_mut().create(ProducerObject {
                    id: 0,
                    owner: self.owner.clone(),
                    signing_key: self.signing_key,
                    url: self.url.clone(),
                    active: self.active,
                    created: now,
                    total_produced: 0,
                    last_confirmed_block_num: 0,
                })?;
            }
        }
        info!("producer {} updated, active: {}", self.owner, self.active);
        Ok(())
    }
}
