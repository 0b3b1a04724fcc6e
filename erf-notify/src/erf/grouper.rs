//! Requester grouping

use std::collections::HashMap;

use crate::erf::{Group, Record};

/// Identity used to decide whether two rows belong to the same requester
fn identity(requester: &str) -> String {
    requester.trim().to_lowercase()
}

/// Group records by requester. Groups come out in first-seen order and keep
/// the first spelling of the requester; records keep their input order.
pub fn group_by_requester(records: Vec<Record>) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let key = identity(&record.requester);
        match index.get(&key) {
            Some(&i) => groups[i].records.push(record),
            None => {
                index.insert(key, groups.len());
                groups.push(Group {
                    requester: record.requester.trim().to_string(),
                    records: vec![record],
                });
            }
        }
    }

    log::info!("Grouped records into {} requesters", groups.len());
    groups
}
