//! OpenAPI document served at `/api-docs`

use insure_core::auth::API_KEY_HEADER;
use serde_json::{json, Value};

fn error_responses(codes: &[&str]) -> Value {
    let descriptions = [
        ("400", "Invalid input"),
        ("401", "Missing or invalid API key"),
        ("403", "API key lacks the required permission"),
        ("404", "Policy not found"),
        ("500", "Internal server error"),
    ];

    let mut responses = serde_json::Map::new();
    for (code, description) in descriptions {
        if codes.contains(&code) {
            responses.insert(
                code.to_string(),
                json!({
                    "description": description,
                    "content": {
                        "application/json": { "schema": { "$ref": "#/components/schemas/Error" } }
                    }
                }),
            );
        }
    }
    Value::Object(responses)
}

fn with_success(mut responses: Value, code: &str, success: Value) -> Value {
    if let Value::Object(map) = &mut responses {
        map.insert(code.to_string(), success);
    }
    responses
}

fn policy_product_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": { "schema": { "$ref": "#/components/schemas/PolicyProduct" } }
        }
    })
}

/// Build the OpenAPI 3 document for the policy routes
pub fn document() -> Value {
    let id_param = json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "string", "example": "pol_001" }
    });
    let secured = json!([{ "ApiKeyAuth": [] }]);

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Insure API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Manage insurance policies linked to a fixed product catalog."
        },
        "paths": {
            "/health": {
                "get": {
                    "summary": "Health check",
                    "responses": { "200": { "description": "Service is up" } }
                }
            },
            "/policies": {
                "get": {
                    "summary": "Search policies by customer name",
                    "parameters": [{
                        "name": "customerName",
                        "in": "query",
                        "required": true,
                        "schema": { "type": "string" }
                    }],
                    "responses": with_success(error_responses(&["400", "500"]), "200", json!({
                        "description": "Matching policies",
                        "content": {
                            "application/json": {
                                "schema": {
                                    "type": "array",
                                    "items": { "$ref": "#/components/schemas/PolicyProduct" }
                                }
                            }
                        }
                    }))
                },
                "post": {
                    "summary": "Create a policy",
                    "security": secured,
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": { "schema": { "$ref": "#/components/schemas/CreatePolicyRequest" } }
                        }
                    },
                    "responses": with_success(
                        error_responses(&["400", "401", "403", "500"]),
                        "201",
                        policy_product_response("Created policy"),
                    )
                }
            },
            "/policies/{id}": {
                "get": {
                    "summary": "Get a policy by id",
                    "parameters": [id_param],
                    "responses": with_success(
                        error_responses(&["400", "404", "500"]),
                        "200",
                        policy_product_response("The policy with its product"),
                    )
                },
                "put": {
                    "summary": "Update a policy",
                    "security": secured,
                    "parameters": [id_param],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": { "schema": { "$ref": "#/components/schemas/UpdatePolicyRequest" } }
                        }
                    },
                    "responses": with_success(
                        error_responses(&["400", "401", "403", "404", "500"]),
                        "200",
                        policy_product_response("Updated policy"),
                    )
                },
                "delete": {
                    "summary": "Delete a policy",
                    "security": secured,
                    "parameters": [id_param],
                    "responses": with_success(
                        error_responses(&["400", "401", "403", "404", "500"]),
                        "204",
                        json!({ "description": "Deleted" }),
                    )
                }
            }
        },
        "components": {
            "securitySchemes": {
                "ApiKeyAuth": { "type": "apiKey", "in": "header", "name": API_KEY_HEADER }
            },
            "schemas": {
                "Status": { "type": "string", "enum": ["active", "expired", "cancelled"] },
                "Product": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string" },
                        "name": { "type": "string" },
                        "category": { "type": "string", "enum": ["home", "motor", "pet", "travel"] },
                        "description": { "type": "string" },
                        "basePrice": { "type": "number" },
                        "createdAt": { "type": "string", "format": "date-time" }
                    }
                },
                "Policy": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "example": "pol_001" },
                        "productId": { "type": "string" },
                        "customerName": { "type": "string" },
                        "startDate": { "type": "string", "format": "date" },
                        "endDate": { "type": "string", "format": "date" },
                        "premium": { "type": "number", "minimum": 0, "exclusiveMinimum": true },
                        "status": { "$ref": "#/components/schemas/Status" },
                        "createdAt": { "type": "string", "format": "date-time" }
                    }
                },
                "PolicyProduct": {
                    "allOf": [
                        { "$ref": "#/components/schemas/Policy" },
                        {
                            "type": "object",
                            "properties": { "product": { "$ref": "#/components/schemas/Product" } }
                        }
                    ]
                },
                "CreatePolicyRequest": {
                    "type": "object",
                    "required": ["productId", "customerName", "startDate", "endDate", "premium"],
                    "properties": {
                        "productId": { "type": "string" },
                        "customerName": { "type": "string", "minLength": 2, "maxLength": 100 },
                        "startDate": { "type": "string", "format": "date" },
                        "endDate": { "type": "string", "format": "date" },
                        "premium": { "type": "number" },
                        "status": { "$ref": "#/components/schemas/Status" }
                    }
                },
                "UpdatePolicyRequest": {
                    "type": "object",
                    "properties": {
                        "productId": { "type": "string" },
                        "customerName": { "type": "string", "minLength": 2, "maxLength": 100 },
                        "startDate": { "type": "string", "format": "date" },
                        "endDate": { "type": "string", "format": "date" },
                        "premium": { "type": "number" },
                        "status": { "$ref": "#/components/schemas/Status" }
                    }
                },
                "Error": {
                    "type": "object",
                    "properties": {
                        "error": { "type": "string" },
                        "message": { "type": "string" },
                        "statusCode": { "type": "integer" }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_policy_operations() {
        let doc = document();
        let paths = doc["paths"].as_object().unwrap();
        assert!(paths.contains_key("/policies"));
        assert!(paths.contains_key("/policies/{id}"));
        assert!(doc["paths"]["/policies/{id}"]["delete"]["responses"]["204"].is_object());
        assert!(doc["paths"]["/policies"]["get"]["responses"]["401"].is_null());
        assert_eq!(doc["components"]["securitySchemes"]["ApiKeyAuth"]["name"], "x-api-key");
    }
}
