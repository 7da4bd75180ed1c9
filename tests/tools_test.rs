//! Integration tests for tool generation from whole documents.

use openapi_tools::{
    generate_operation_id, load_document_str, validate_arguments, ClientConfig, HttpMethod,
    SchemaResolver, ToolSet,
};
use serde_json::{json, Value};

fn tool_set(document: Value) -> ToolSet {
    ToolSet::from_document(document, &ClientConfig::new()).unwrap()
}

fn petstore() -> Value {
    json!({
        "openapi": "3.0.3",
        "info": { "title": "Petstore", "version": "1.0.0" },
        "servers": [{ "url": "https://petstore.example.com/v2" }],
        "paths": {
            "/pets": {
                "parameters": [
                    { "name": "X-Tenant", "in": "header", "required": true, "schema": { "type": "string" } }
                ],
                "get": {
                    "operationId": "listPets",
                    "summary": "List pets",
                    "description": "Returns every pet the caller can see",
                    "tags": ["pets", "read"],
                    "parameters": [
                        { "name": "limit", "in": "query", "description": "Page size", "schema": { "type": "integer" } },
                        { "name": "status", "in": "query", "required": true,
                          "schema": { "$ref": "#/components/schemas/Status" } },
                        { "name": "session", "in": "cookie", "required": true, "schema": { "type": "string" } }
                    ],
                    "responses": {
                        "default": { "description": "error" },
                        "200": { "description": "ok" },
                        "404": { "description": "none" },
                        "201": { "description": "created" }
                    }
                },
                "post": {
                    "operationId": "createPet",
                    "requestBody": {
                        "required": true,
                        "content": {
                            "multipart/form-data": { "schema": { "type": "object" } },
                            "application/json": { "schema": { "$ref": "#/components/schemas/Pet" } }
                        }
                    },
                    "responses": { "201": { "description": "created" } }
                }
            },
            "/api/v1/complex-path/{id}": {
                "get": {
                    "parameters": [
                        { "name": "id", "in": "path", "required": true, "schema": { "type": "string" } }
                    ]
                }
            }
        },
        "components": {
            "schemas": {
                "Status": { "type": "string", "enum": ["available", "pending", "sold"] },
                "Pet": {
                    "type": "object",
                    "required": ["name"],
                    "properties": {
                        "name": { "type": "string" },
                        "status": { "$ref": "#/components/schemas/Status" },
                        "owner": {
                            "oneOf": [
                                { "$ref": "#/components/schemas/Person" },
                                { "type": "string" }
                            ]
                        }
                    }
                },
                "Person": {
                    "type": "object",
                    "properties": { "name": { "type": "string" } }
                },
                "Entity": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string" },
                        "parent": { "$ref": "#/components/schemas/Entity" },
                        "children": { "type": "array", "items": { "$ref": "#/components/schemas/Entity" } }
                    }
                }
            }
        }
    })
}

mod generation {
    use super::*;

    #[test]
    fn one_tool_per_operation() {
        let tools = tool_set(petstore());
        let names: Vec<&str> = tools.tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names.len(), 3);
        assert!(names.contains(&"listPets"));
        assert!(names.contains(&"createPet"));
        assert!(names.contains(&"get__api_v1_complex_path__id_"));
    }

    #[test]
    fn generated_identifier_is_deterministic() {
        assert_eq!(
            generate_operation_id(HttpMethod::Get, "/api/v1/complex-path/{id}"),
            "get__api_v1_complex_path__id_"
        );
        let tool = tool_set(petstore());
        let tool = tool.tool("get__api_v1_complex_path__id_").unwrap();
        assert_eq!(tool.description, "GET /api/v1/complex-path/{id}\nReturns: 200");
    }

    #[test]
    fn description_format() {
        let tools = tool_set(petstore());
        let tool = tools.tool("listPets").unwrap();
        assert_eq!(
            tool.description,
            "List pets. Returns every pet the caller can see\nTags: pets, read\nReturns: 200, 201, 404, default"
        );
    }

    #[test]
    fn contract_serializes_with_camel_case_input_schema() {
        let tools = tool_set(petstore());
        let value = serde_json::to_value(tools.tool("createPet").unwrap()).unwrap();
        assert_eq!(value["name"], "createPet");
        assert_eq!(value["inputSchema"]["type"], "object");
        assert_eq!(value["inputSchema"]["additionalProperties"], false);
    }
}

mod input_schema {
    use super::*;

    #[test]
    fn required_lists_parameters_in_declared_order() {
        let tools = tool_set(petstore());
        let schema = &tools.tool("listPets").unwrap().input_schema;

        // Path-level header first, cookie parameters are not exposed.
        assert_eq!(schema["required"], json!(["X-Tenant", "status"]));
        let properties = schema["properties"].as_object().unwrap();
        let keys: Vec<&str> = properties.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["X-Tenant", "limit", "status"]);
        assert_eq!(schema["additionalProperties"], false);
    }

    #[test]
    fn required_body_is_appended() {
        let tools = tool_set(petstore());
        let schema = &tools.tool("createPet").unwrap().input_schema;
        assert_eq!(schema["required"], json!(["X-Tenant", "body"]));
    }

    #[test]
    fn parameter_description_appended() {
        let tools = tool_set(petstore());
        let schema = &tools.tool("listPets").unwrap().input_schema;
        assert_eq!(schema["properties"]["limit"]["type"], "integer");
        assert_eq!(schema["properties"]["limit"]["description"], "Page size");
    }

    #[test]
    fn enum_values_listed_in_declared_order() {
        let tools = tool_set(petstore());
        let status = &tools.tool("listPets").unwrap().input_schema["properties"]["status"];
        let description = status["description"].as_str().unwrap();
        assert!(description.contains("Allowed values: available, pending, sold"));
        assert_eq!(status["enum"], json!(["available", "pending", "sold"]));
    }

    #[test]
    fn body_uses_preferred_media_type_and_lists_all() {
        let tools = tool_set(petstore());
        let body = &tools.tool("createPet").unwrap().input_schema["properties"]["body"];

        assert_eq!(body["type"], "object");
        assert_eq!(body["required"], json!(["name"]));
        assert!(body["properties"]["status"]["description"]
            .as_str()
            .unwrap()
            .contains("Allowed values"));
        let description = body["description"].as_str().unwrap();
        assert!(description.contains("Content types: application/json, multipart/form-data"));
    }

    #[test]
    fn composition_members_resolved_with_note() {
        let tools = tool_set(petstore());
        let owner = &tools.tool("createPet").unwrap().input_schema["properties"]["body"]["properties"]["owner"];
        let members = owner["oneOf"].as_array().unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0]["properties"]["name"]["type"], "string");
        assert!(owner["description"]
            .as_str()
            .unwrap()
            .contains("one of 2 variants"));
        assert!(!owner.to_string().contains("$ref"));
    }
}

mod resolution {
    use super::*;

    #[test]
    fn self_referential_schema_is_finite() {
        let document = petstore();
        let resolved = SchemaResolver::new(&document)
            .resolve_value(&json!({ "$ref": "#/components/schemas/Entity" }));

        let properties = resolved["properties"].as_object().unwrap();
        let keys: Vec<&str> = properties.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["id", "parent", "children"]);

        let parent = &resolved["properties"]["parent"];
        assert_eq!(parent["type"], "object");
        assert!(parent["properties"].get("parent").is_some());
        assert!(parent["description"]
            .as_str()
            .unwrap()
            .contains("Circular reference to Entity"));
        assert!(!resolved.to_string().contains("$ref"));
    }

    #[test]
    fn composition_siblings_dereferenced_in_contract() {
        let mut document = petstore();
        document["components"]["schemas"]["Adoption"] = json!({
            "allOf": [{ "$ref": "#/components/schemas/Person" }],
            "required": ["pet"],
            "properties": {
                "pet": { "$ref": "#/components/schemas/Pet" },
                "history": { "type": "array", "items": { "$ref": "#/components/schemas/Status" } }
            }
        });
        document["paths"]["/adoptions"] = json!({ "post": {
            "operationId": "adopt",
            "requestBody": { "required": true, "content": { "application/json": {
                "schema": { "$ref": "#/components/schemas/Adoption" }
            } } }
        } });

        let tools = tool_set(document);
        let tool = tools.tool("adopt").unwrap();
        let body = &tool.input_schema["properties"]["body"];
        assert!(!tool.input_schema.to_string().contains("$ref"));
        assert_eq!(body["properties"]["pet"]["required"], json!(["name"]));
        assert_eq!(body["properties"]["history"]["items"]["type"], "string");
        assert_eq!(body["allOf"][0]["properties"]["name"]["type"], "string");

        let args = json!({ "body": {
            "name": "Ann",
            "pet": { "name": "Rex", "status": "sold" },
            "history": ["pending"]
        } });
        assert!(validate_arguments(tool, &args).is_ok());

        let bad = json!({ "body": { "pet": { "status": "lost" } } });
        assert!(validate_arguments(tool, &bad).is_err());
    }

    #[test]
    fn reference_free_schema_unchanged() {
        let document = petstore();
        let schema = json!({
            "type": "object",
            "required": ["a"],
            "properties": {
                "a": { "type": "integer", "minimum": 1 },
                "b": { "type": "array", "items": { "type": "string", "format": "uuid" } }
            }
        });
        assert_eq!(SchemaResolver::new(&document).resolve_value(&schema), schema);
    }

    #[test]
    fn malformed_schema_degrades() {
        let document = petstore();
        let resolved = SchemaResolver::new(&document)
            .resolve_value(&json!({ "$ref": "#/components/schemas/Nowhere" }));
        assert!(resolved.is_object());
        assert!(resolved.get("type").is_none());
    }
}

mod documents {
    use super::*;

    #[test]
    fn yaml_swagger_document() {
        let yaml = r##"
swagger: "2.0"
host: api.example.com
basePath: /v1
schemes: [https]
paths:
  /users/{userId}:
    put:
      operationId: updateUser
      parameters:
        - name: userId
          in: path
          required: true
          type: integer
        - name: user
          in: body
          required: true
          schema:
            $ref: "#/definitions/User"
definitions:
  User:
    type: object
    properties:
      email:
        type: string
"##;
        let tools = tool_set(load_document_str(yaml).unwrap());
        let tool = tools.tool("updateUser").unwrap();
        assert_eq!(tool.input_schema["properties"]["userId"]["type"], "integer");
        assert_eq!(
            tool.input_schema["properties"]["body"]["properties"]["email"]["type"],
            "string"
        );
        assert_eq!(tool.input_schema["required"], json!(["userId", "body"]));
        assert_eq!(
            tools.executor().base_url().as_str(),
            "https://api.example.com/v1"
        );
    }

    #[test]
    fn metadata_lookup() {
        let tools = tool_set(petstore());
        let meta = tools.get_metadata("createPet").unwrap();
        assert_eq!(meta.operation_id, "createPet");
        assert_eq!(meta.method, "POST");
        assert_eq!(meta.path, "/pets");
        assert!(tools.get_metadata("missing").is_none());
    }

    #[test]
    fn base_url_override_wins() {
        let config = ClientConfig::new().base_url("http://localhost:8080/api");
        let tools = ToolSet::from_document(petstore(), &config).unwrap();
        assert_eq!(tools.executor().base_url().as_str(), "http://localhost:8080/api");
    }
}
