//! Shopify Admin API client (GraphQL for carts and orders, REST for
//! recurring application charges).

use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use std::time::Duration;

use super::{ChargeRequest, CommercePlatform, PlatformError, RecurringCharge};
use crate::config::ShopifyConfig;
use crate::domain::aggregates::{CartLine, CartSnapshot, OrderHistory, OrderLineInput, OrderRecord, RefundLineInput, RefundRecord};
use crate::domain::value_objects::{AnalysisPeriod, ProductId};

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";
const ORDERS_PAGE_SIZE: u32 = 100;

const CART_QUERY: &str = r#"
query getCart($id: ID!) {
  cart(id: $id) {
    id
    lines(first: 100) {
      edges {
        node {
          id
          quantity
          merchandise { ... on ProductVariant { product { id } } }
        }
      }
    }
  }
}"#;

const ORDERS_QUERY: &str = r#"
query orderHistory($first: Int!, $after: String, $query: String!) {
  orders(first: $first, after: $after, query: $query, sortKey: CREATED_AT) {
    pageInfo { hasNextPage endCursor }
    edges {
      node {
        id
        lineItems(first: 100) {
          edges {
            node {
              title
              quantity
              product { id }
              originalUnitPriceSet { shopMoney { amount } }
            }
          }
        }
        refunds {
          id
          refundLineItems(first: 100) {
            edges {
              node {
                quantity
                lineItem { product { id } }
                priceSet { shopMoney { amount } }
              }
            }
          }
        }
      }
    }
  }
}"#;

pub struct ShopifyAdminClient {
    http: reqwest::Client,
    shop: String,
    base_url: String,
    access_token: SecretString,
    max_order_pages: u32,
}

impl ShopifyAdminClient {
    pub fn new(config: &ShopifyConfig, max_order_pages: u32) -> Result<Self, PlatformError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("maldify/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            shop: config.shop_domain.clone(),
            base_url: format!("https://{}/admin/api/{}", config.shop_domain, config.api_version),
            access_token: config.access_token.clone(),
            max_order_pages: max_order_pages.max(1),
        })
    }

    pub fn base_url(&self) -> &str { &self.base_url }

    async fn graphql<T: DeserializeOwned>(&self, query: &str, variables: serde_json::Value) -> Result<T, PlatformError> {
        let response = self
            .http
            .post(format!("{}/graphql.json", self.base_url))
            .header(ACCESS_TOKEN_HEADER, self.access_token.expose_secret())
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;
        parse_graphql(&read_body(response).await?)
    }

    async fn rest<T: DeserializeOwned>(&self, method: reqwest::Method, path: &str, body: Option<serde_json::Value>) -> Result<T, PlatformError> {
        let mut request = self
            .http
            .request(method, format!("{}/{}", self.base_url, path))
            .header(ACCESS_TOKEN_HEADER, self.access_token.expose_secret());
        if let Some(body) = body { request = request.json(&body); }
        let body = read_body(request.send().await?).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl CommercePlatform for ShopifyAdminClient {
    fn shop(&self) -> &str { &self.shop }

    async fn fetch_cart(&self, cart_id: &str) -> Result<Option<CartSnapshot>, PlatformError> {
        let data: CartData = self.graphql(CART_QUERY, json!({ "id": cart_id })).await?;
        Ok(data.into_snapshot())
    }

    async fn fetch_order_history(&self, period: &AnalysisPeriod) -> Result<OrderHistory, PlatformError> {
        let search = order_search_query(period);
        let mut history = OrderHistory::default();
        let mut cursor: Option<String> = None;

        for page in 1..=self.max_order_pages {
            let data: OrdersData = self.graphql(ORDERS_QUERY, json!({ "first": ORDERS_PAGE_SIZE, "after": cursor, "query": search })).await?;
            cursor = data.append_to(&mut history);
            if cursor.is_none() { break; }
            if page == self.max_order_pages {
                tracing::warn!(shop = %self.shop, pages = page, orders = history.orders.len(), "order history truncated at page limit");
            }
        }

        tracing::debug!(shop = %self.shop, orders = history.orders.len(), refunds = history.refunds.len(), "fetched order history");
        Ok(history)
    }

    async fn create_recurring_charge(&self, request: &ChargeRequest) -> Result<RecurringCharge, PlatformError> {
        let body = json!({ "recurring_application_charge": request });
        let envelope: ChargeEnvelope = self.rest(reqwest::Method::POST, "recurring_application_charges.json", Some(body)).await?;
        Ok(envelope.recurring_application_charge)
    }

    async fn active_recurring_charges(&self) -> Result<Vec<RecurringCharge>, PlatformError> {
        let envelope: ChargeListEnvelope = self.rest(reqwest::Method::GET, "recurring_application_charges.json", None).await?;
        Ok(active_only(envelope.recurring_application_charges))
    }

    async fn activate_recurring_charge(&self, charge_id: u64) -> Result<RecurringCharge, PlatformError> {
        let path = format!("recurring_application_charges/{charge_id}/activate.json");
        let body = json!({ "recurring_application_charge": { "id": charge_id } });
        let envelope: ChargeEnvelope = self.rest(reqwest::Method::POST, &path, Some(body)).await?;
        Ok(envelope.recurring_application_charge)
    }
}

async fn read_body(response: reqwest::Response) -> Result<String, PlatformError> {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .map(|secs| secs.ceil().max(0.0) as u64);
    let body = response.text().await?;
    if status.is_success() { return Ok(body); }
    Err(status_error(status, body, retry_after))
}

fn status_error(status: StatusCode, body: String, retry_after: Option<u64>) -> PlatformError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PlatformError::Unauthorized(body),
        StatusCode::NOT_FOUND => PlatformError::NotFound(body),
        StatusCode::TOO_MANY_REQUESTS => PlatformError::RateLimited(retry_after.unwrap_or(2)),
        s if s.is_client_error() => PlatformError::InvalidRequest(body),
        s => PlatformError::Upstream { status: s.as_u16(), body },
    }
}

fn order_search_query(period: &AnalysisPeriod) -> String {
    format!(
        "created_at:>='{}' created_at:<='{}'",
        period.start().to_rfc3339_opts(SecondsFormat::Secs, true),
        period.end().to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

fn active_only(charges: Vec<RecurringCharge>) -> Vec<RecurringCharge> {
    charges.into_iter().filter(|c| c.status.eq_ignore_ascii_case("active")).collect()
}

fn parse_graphql<T: DeserializeOwned>(body: &str) -> Result<T, PlatformError> {
    let response: GraphQlResponse<T> = serde_json::from_str(body)?;
    if !response.errors.is_empty() {
        let messages: Vec<&str> = response.errors.iter().map(|e| e.message.as_str()).collect();
        return Err(PlatformError::GraphQl(messages.join("; ")));
    }
    response.data.ok_or_else(|| PlatformError::Decode("GraphQL response carried no data".to_string()))
}

fn parse_amount(bag: Option<&MoneyBag>) -> Option<Decimal> {
    bag.and_then(|b| Decimal::from_str(b.shop_money.amount.trim()).ok())
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError { message: String }

#[derive(Deserialize)]
struct Connection<T> {
    edges: Vec<Edge<T>>,
    #[serde(rename = "pageInfo", default)]
    page_info: Option<PageInfo>,
}

#[derive(Deserialize)]
struct Edge<T> { node: T }

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo { has_next_page: bool, end_cursor: Option<String> }

#[derive(Deserialize)]
struct IdNode { id: String }

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoneyBag { shop_money: MoneyV2 }

#[derive(Deserialize)]
struct MoneyV2 { amount: String }

#[derive(Deserialize)]
struct CartData { cart: Option<CartNode> }

#[derive(Deserialize)]
struct CartNode { id: String, lines: Connection<CartLineNode> }

#[derive(Deserialize)]
struct CartLineNode { id: String, quantity: u32, merchandise: Option<Merchandise> }

#[derive(Deserialize)]
struct Merchandise { product: Option<IdNode> }

impl CartData {
    fn into_snapshot(self) -> Option<CartSnapshot> {
        let cart = self.cart?;
        let lines = cart
            .lines
            .edges
            .into_iter()
            .map(|edge| {
                let product_id = edge.node.merchandise.and_then(|m| m.product).and_then(|p| ProductId::new(p.id).ok());
                CartLine { id: edge.node.id, quantity: edge.node.quantity, product_id }
            })
            .collect();
        Some(CartSnapshot::new(cart.id, lines))
    }
}

#[derive(Deserialize)]
struct OrdersData { orders: Connection<OrderNode> }

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderNode {
    id: String,
    line_items: Connection<LineItemNode>,
    #[serde(default)]
    refunds: Vec<RefundNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LineItemNode {
    title: Option<String>,
    quantity: Option<i64>,
    product: Option<IdNode>,
    original_unit_price_set: Option<MoneyBag>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefundNode { id: String, refund_line_items: Connection<RefundLineNode> }

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefundLineNode {
    quantity: Option<i64>,
    line_item: Option<RefundedLine>,
    price_set: Option<MoneyBag>,
}

#[derive(Deserialize)]
struct RefundedLine { product: Option<IdNode> }

impl OrdersData {
    /// Moves this page's orders and refunds into `history`, returning the
    /// cursor of the next page if there is one.
    fn append_to(self, history: &mut OrderHistory) -> Option<String> {
        let next = self.orders.page_info.filter(|p| p.has_next_page).and_then(|p| p.end_cursor);
        for edge in self.orders.edges {
            let order = edge.node;
            let line_items = order
                .line_items
                .edges
                .into_iter()
                .map(|e| OrderLineInput {
                    product_id: e.node.product.map(|p| p.id),
                    quantity: e.node.quantity,
                    price: parse_amount(e.node.original_unit_price_set.as_ref()),
                    title: e.node.title,
                })
                .collect();
            for refund in order.refunds {
                let line_items = refund
                    .refund_line_items
                    .edges
                    .into_iter()
                    .map(|e| RefundLineInput {
                        product_id: e.node.line_item.and_then(|l| l.product).map(|p| p.id),
                        quantity: e.node.quantity,
                        price: parse_amount(e.node.price_set.as_ref()),
                    })
                    .collect();
                history.refunds.push(RefundRecord { id: Some(refund.id), order_id: Some(order.id.clone()), line_items });
            }
            history.orders.push(OrderRecord { id: Some(order.id), line_items });
        }
        next
    }
}

#[derive(Deserialize)]
struct ChargeEnvelope { recurring_application_charge: RecurringCharge }

#[derive(Deserialize)]
struct ChargeListEnvelope { recurring_application_charges: Vec<RecurringCharge> }
