//! Request body decoding and response shapes shared by the handlers.

use catalog_store::{Contact, LineDetails, OrderDetails, OrderStatus, Shop, StockEntry};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// `items` as a JSON list, or the same list encoded in a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ItemList {
    List(Vec<Value>),
    Encoded(String),
}

/// Body of the basket POST and PUT requests.
#[derive(Debug, Deserialize)]
pub struct ItemsRequest {
    #[serde(default)]
    pub items: Option<ItemList>,
}

impl ItemsRequest {
    /// Decodes every element of `items` as `T`, reporting each malformed one.
    pub fn decode_items<T: DeserializeOwned>(self) -> Result<Vec<T>, ApiError> {
        let items = match self.items {
            None => return Err(ApiError::bad_request("items are required")),
            Some(ItemList::List(items)) => items,
            Some(ItemList::Encoded(raw)) if raw.trim().is_empty() => {
                return Err(ApiError::bad_request("items are required"));
            }
            Some(ItemList::Encoded(raw)) => serde_json::from_str::<Vec<Value>>(&raw)
                .map_err(|e| ApiError::bad_request(format!("items must be a list: {e}")))?,
        };
        if items.is_empty() {
            return Err(ApiError::bad_request("items are required"));
        }

        let mut errors = Vec::new();
        let mut decoded = Vec::with_capacity(items.len());
        for (position, item) in items.into_iter().enumerate() {
            match serde_json::from_value::<T>(item) {
                Ok(item) => decoded.push(item),
                Err(e) => errors.push(format!("item {position}: {e}")),
            }
        }
        if errors.is_empty() {
            Ok(decoded)
        } else {
            Err(ApiError::BadRequest(errors))
        }
    }
}

/// One element of a basket POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AddItemRequest {
    pub product_info: i64,
    pub quantity: u32,
}

/// One element of a basket PUT. Zero releases the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct UpdateItemRequest {
    pub id: i64,
    pub quantity: u32,
}

/// Line ids of a basket DELETE: `"1,2,3"`, a single id, or a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LineIds {
    Joined(String),
    Single(i64),
    List(Vec<i64>),
}

impl LineIds {
    /// Renders the ids in the comma-separated form.
    pub fn joined(self) -> String {
        match self {
            LineIds::Joined(raw) => raw,
            LineIds::Single(id) => id.to_string(),
            LineIds::List(ids) => ids
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RemoveItemsRequest {
    #[serde(default)]
    pub items: Option<LineIds>,
}

/// An id given as a number or as a digit string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IdField {
    Number(i64),
    Text(String),
}

impl IdField {
    /// Returns the id when it is a positive integer.
    pub fn positive(&self) -> Option<i64> {
        let id = match self {
            IdField::Number(id) => Some(*id),
            IdField::Text(raw) => raw.trim().parse().ok(),
        };
        id.filter(|id| *id > 0)
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub id: Option<IdField>,
    #[serde(default)]
    pub contact: Option<IdField>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContactRequest {
    pub city: Option<String>,
    pub street: Option<String>,
    pub house: Option<String>,
    pub structure: Option<String>,
    pub building: Option<String>,
    pub apartment: Option<String>,
    pub phone: Option<String>,
}

/// `state` of the partner switch: a bool, `0`/`1`, or a flag word.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FlagField {
    Bool(bool),
    Number(u64),
    Text(String),
}

#[derive(Debug, Deserialize)]
pub struct PartnerStateRequest {
    #[serde(default)]
    pub state: Option<FlagField>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(rename = "Status")]
    pub status: bool,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self { status: true }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductInfoResponse {
    pub id: i64,
    pub model: String,
    pub product: String,
    pub shop: i64,
    pub quantity: u32,
    pub price: i64,
    pub price_rrc: i64,
}

impl From<&StockEntry> for ProductInfoResponse {
    fn from(entry: &StockEntry) -> Self {
        Self {
            id: entry.id.as_i64(),
            model: entry.model.clone(),
            product: entry.product_name.clone(),
            shop: entry.shop_id.as_i64(),
            quantity: entry.quantity,
            price: entry.price.amount(),
            price_rrc: entry.price_rrc.amount(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LineResponse {
    pub id: i64,
    pub product_info: ProductInfoResponse,
    pub quantity: u32,
    /// Unit price at reservation time.
    pub price: i64,
}

impl From<&LineDetails> for LineResponse {
    fn from(details: &LineDetails) -> Self {
        Self {
            id: details.line.id.as_i64(),
            product_info: ProductInfoResponse::from(&details.stock),
            quantity: details.line.quantity,
            price: details.line.price.amount(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: i64,
    pub ordered_items: Vec<LineResponse>,
    pub state: OrderStatus,
    pub dt: DateTime<Utc>,
    pub total_sum: i64,
    pub contact: Option<i64>,
}

impl From<&OrderDetails> for OrderResponse {
    fn from(details: &OrderDetails) -> Self {
        Self {
            id: details.order.id.as_i64(),
            ordered_items: details.lines.iter().map(LineResponse::from).collect(),
            state: details.order.status,
            dt: details.order.created_at,
            total_sum: details.total().amount(),
            contact: details.order.contact_id.map(|id| id.as_i64()),
        }
    }
}

pub fn orders_response(orders: &[OrderDetails]) -> Vec<OrderResponse> {
    orders.iter().map(OrderResponse::from).collect()
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub id: i64,
    pub city: String,
    pub street: String,
    pub house: Option<String>,
    pub structure: Option<String>,
    pub building: Option<String>,
    pub apartment: Option<String>,
    pub phone: String,
}

impl From<Contact> for ContactResponse {
    fn from(contact: Contact) -> Self {
        Self {
            id: contact.id.as_i64(),
            city: contact.city,
            street: contact.street,
            house: contact.house,
            structure: contact.structure,
            building: contact.building,
            apartment: contact.apartment,
            phone: contact.phone,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ShopResponse {
    pub id: i64,
    pub name: String,
    pub state: bool,
}

impl From<Shop> for ShopResponse {
    fn from(shop: Shop) -> Self {
        Self {
            id: shop.id.as_i64(),
            name: shop.name,
            state: shop.accepts_orders,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request(body: Value) -> ItemsRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn items_may_be_a_json_string() {
        let body = request(json!({ "items": "[{\"product_info\": 1, \"quantity\": 2}]" }));
        let items: Vec<AddItemRequest> = body.decode_items().unwrap();
        assert_eq!(
            items,
            vec![AddItemRequest {
                product_info: 1,
                quantity: 2,
            }]
        );
    }

    #[test]
    fn string_typed_numbers_are_rejected() {
        let body = request(json!({ "items": [{ "product_info": "1", "quantity": "2" }] }));
        let result = body.decode_items::<AddItemRequest>();
        assert!(matches!(result, Err(ApiError::BadRequest(errors)) if errors.len() == 1));
    }

    #[test]
    fn every_malformed_item_is_reported() {
        let body = request(json!({ "items": [
            { "id": 1, "quantity": 2 },
            { "id": 2, "quantity": -1 },
            { "id": 3.5, "quantity": 1 },
            { "quantity": 1 },
        ] }));
        match body.decode_items::<UpdateItemRequest>() {
            Err(ApiError::BadRequest(errors)) => {
                assert_eq!(errors.len(), 3);
                assert!(errors[0].starts_with("item 1:"));
            }
            other => panic!("expected bad request, got {other:?}"),
        }
    }

    #[test]
    fn missing_items_are_rejected() {
        assert!(request(json!({})).decode_items::<AddItemRequest>().is_err());
        assert!(request(json!({ "items": "" })).decode_items::<AddItemRequest>().is_err());
        assert!(request(json!({ "items": [] })).decode_items::<AddItemRequest>().is_err());
        assert!(request(json!({ "items": "1,2,3" })).decode_items::<AddItemRequest>().is_err());
    }

    #[test]
    fn line_ids_join_into_one_list() {
        let ids = |body: Value| {
            serde_json::from_value::<RemoveItemsRequest>(body)
                .unwrap()
                .items
                .unwrap()
                .joined()
        };
        assert_eq!(ids(json!({ "items": "1,2" })), "1,2");
        assert_eq!(ids(json!({ "items": 5 })), "5");
        assert_eq!(ids(json!({ "items": [3, 4] })), "3,4");
    }

    #[test]
    fn ids_accept_numbers_and_digit_strings() {
        let checkout: CheckoutRequest =
            serde_json::from_value(json!({ "id": "4", "contact": 9 })).unwrap();
        assert_eq!(checkout.id.and_then(|id| id.positive()), Some(4));
        assert_eq!(checkout.contact.and_then(|id| id.positive()), Some(9));
        assert_eq!(IdField::Text("x".to_string()).positive(), None);
        assert_eq!(IdField::Number(0).positive(), None);
    }
}
