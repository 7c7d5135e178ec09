/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Canonical structured field values and value-format helpers.

use crate::routing::message::Message;

pub const RESOURCE_EVALUATOR: &str = "evaluator";
pub const RESOURCE_SINK: &str = "sink";
pub const RESOURCE_NOTIFIER: &str = "notifier";

pub const REASON_SUBSCRIBE_FAILED: &str = "subscribe_failed";
pub const REASON_CACHE_DROPPED: &str = "cache_dropped";

/// Formats the ids of a batch for a single log field, e.g. `[m-1,m-2]`.
pub fn format_message_ids(messages: &[Message]) -> String {
    let ids: Vec<&str> = messages.iter().map(|message| message.id()).collect();
    format!("[{}]", ids.join(","))
}

#[cfg(test)]
mod tests {
    use super::format_message_ids;
    use crate::routing::message::Message;

    #[test]
    fn format_message_ids_joins_in_batch_order() {
        let batch = vec![
            Message::with_id("m-1", b"a".to_vec()),
            Message::with_id("m-2", b"b".to_vec()),
        ];

        assert_eq!(format_message_ids(&batch), "[m-1,m-2]");
        assert_eq!(format_message_ids(&[]), "[]");
    }
}
