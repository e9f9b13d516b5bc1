use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use serde_json::Value;

use super::traits::{
    decode_cursor, encode_cursor, Item, Page, RecordStore, StoreError, StoreResult, PK, SK,
};

/// DynamoDB-backed record store.
#[derive(Clone)]
pub struct DynamoStore {
    client: DynamoClient,
    table_name: String,
}

impl DynamoStore {
    pub fn new(client: DynamoClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Build a store from ambient AWS configuration.
    pub async fn from_env(table_name: impl Into<String>) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;
        Self::new(DynamoClient::new(&config), table_name)
    }
}

#[async_trait]
impl RecordStore for DynamoStore {
    async fn put(&self, item: Item) -> StoreResult<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item_to_attrs(&item)))
            .send()
            .await
            .map_err(|e| StoreError::Backend {
                op: "put_item",
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn put_new(&self, item: Item) -> StoreResult<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item_to_attrs(&item)))
            .condition_expression("attribute_not_exists(SK)")
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .is_some_and(|s| s.is_conditional_check_failed_exception())
                {
                    StoreError::ConditionFailed { op: "put_item" }
                } else {
                    StoreError::Backend {
                        op: "put_item",
                        message: e.to_string(),
                    }
                }
            })?;
        Ok(())
    }

    async fn get(&self, pk: &str, sk: &str) -> StoreResult<Option<Item>> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(PK, AttributeValue::S(pk.to_string()))
            .key(SK, AttributeValue::S(sk.to_string()))
            .send()
            .await
            .map_err(|e| StoreError::Backend {
                op: "get_item",
                message: e.to_string(),
            })?;
        Ok(result.item().map(attrs_to_item))
    }

    async fn query_prefix(&self, pk: &str, sk_prefix: &str) -> StoreResult<Vec<Item>> {
        let mut items = Vec::new();
        let mut last_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let mut request = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
                .expression_attribute_values(":pk", AttributeValue::S(pk.to_string()))
                .expression_attribute_values(":sk_prefix", AttributeValue::S(sk_prefix.to_string()));
            if let Some(key) = last_key.take() {
                request = request.set_exclusive_start_key(Some(key));
            }

            let response = request.send().await.map_err(|e| StoreError::Backend {
                op: "query",
                message: e.to_string(),
            })?;

            items.extend(response.items().iter().map(attrs_to_item));

            match response.last_evaluated_key() {
                Some(key) if !key.is_empty() => last_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(items)
    }

    async fn query_page(
        &self,
        pk: &str,
        sk_prefix: &str,
        limit: i32,
        cursor: Option<&str>,
    ) -> StoreResult<Page> {
        let mut request = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
            .expression_attribute_values(":pk", AttributeValue::S(pk.to_string()))
            .expression_attribute_values(":sk_prefix", AttributeValue::S(sk_prefix.to_string()))
            .limit(limit);
        if let Some(cursor) = cursor {
            let (cpk, csk) = decode_cursor(cursor)?;
            request = request.set_exclusive_start_key(Some(key_map(&cpk, &csk)));
        }

        let response = request.send().await.map_err(|e| StoreError::Backend {
            op: "query",
            message: e.to_string(),
        })?;

        Ok(Page {
            items: response.items().iter().map(attrs_to_item).collect(),
            next_cursor: response.last_evaluated_key().and_then(cursor_from_key),
        })
    }

    async fn scan_page(&self, limit: i32, cursor: Option<&str>) -> StoreResult<Page> {
        let mut request = self
            .client
            .scan()
            .table_name(&self.table_name)
            .limit(limit);
        if let Some(cursor) = cursor {
            let (cpk, csk) = decode_cursor(cursor)?;
            request = request.set_exclusive_start_key(Some(key_map(&cpk, &csk)));
        }

        let response = request.send().await.map_err(|e| StoreError::Backend {
            op: "scan",
            message: e.to_string(),
        })?;

        Ok(Page {
            items: response.items().iter().map(attrs_to_item).collect(),
            next_cursor: response.last_evaluated_key().and_then(cursor_from_key),
        })
    }

    async fn update(&self, pk: &str, sk: &str, changes: Item) -> StoreResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut update_expr = vec![];
        let mut expr_names = HashMap::new();
        let mut expr_values = HashMap::new();

        for (i, (field, value)) in changes.iter().enumerate() {
            let name = format!("#f{}", i);
            let placeholder = format!(":v{}", i);
            update_expr.push(format!("{} = {}", name, placeholder));
            expr_names.insert(name, field.clone());
            expr_values.insert(placeholder, to_attr(value));
        }

        let mut builder = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key(PK, AttributeValue::S(pk.to_string()))
            .key(SK, AttributeValue::S(sk.to_string()))
            .update_expression(format!("SET {}", update_expr.join(", ")))
            .condition_expression("attribute_exists(SK)");

        for (k, v) in expr_names {
            builder = builder.expression_attribute_names(k, v);
        }
        for (k, v) in expr_values {
            builder = builder.expression_attribute_values(k, v);
        }

        builder.send().await.map_err(|e| {
            if e.as_service_error()
                .is_some_and(|s| s.is_conditional_check_failed_exception())
            {
                StoreError::ConditionFailed { op: "update_item" }
            } else {
                StoreError::Backend {
                    op: "update_item",
                    message: e.to_string(),
                }
            }
        })?;
        Ok(())
    }

    async fn delete(&self, pk: &str, sk: &str) -> StoreResult<()> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key(PK, AttributeValue::S(pk.to_string()))
            .key(SK, AttributeValue::S(sk.to_string()))
            .send()
            .await
            .map_err(|e| StoreError::Backend {
                op: "delete_item",
                message: e.to_string(),
            })?;
        Ok(())
    }
}

fn key_map(pk: &str, sk: &str) -> HashMap<String, AttributeValue> {
    HashMap::from([
        (PK.to_string(), AttributeValue::S(pk.to_string())),
        (SK.to_string(), AttributeValue::S(sk.to_string())),
    ])
}

fn cursor_from_key(key: &HashMap<String, AttributeValue>) -> Option<String> {
    let pk = key.get(PK).and_then(|v| v.as_s().ok())?;
    let sk = key.get(SK).and_then(|v| v.as_s().ok())?;
    Some(encode_cursor(pk, sk))
}

fn item_to_attrs(item: &Item) -> HashMap<String, AttributeValue> {
    item.iter().map(|(k, v)| (k.clone(), to_attr(v))).collect()
}

fn attrs_to_item(attrs: &HashMap<String, AttributeValue>) -> Item {
    attrs.iter().map(|(k, v)| (k.clone(), from_attr(v))).collect()
}

fn to_attr(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(values) => AttributeValue::L(values.iter().map(to_attr).collect()),
        Value::Object(map) => {
            AttributeValue::M(map.iter().map(|(k, v)| (k.clone(), to_attr(v))).collect())
        }
    }
}

fn from_attr(attr: &AttributeValue) -> Value {
    match attr {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => parse_number(n),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(values) => Value::Array(values.iter().map(from_attr).collect()),
        AttributeValue::M(map) => {
            Value::Object(map.iter().map(|(k, v)| (k.clone(), from_attr(v))).collect())
        }
        other => {
            tracing::warn!("unsupported attribute type {:?}, reading as null", other);
            Value::Null
        }
    }
}

fn parse_number(text: &str) -> Value {
    if let Ok(i) = text.parse::<i64>() {
        return Value::Number(i.into());
    }
    text.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(text.to_string()))
}
