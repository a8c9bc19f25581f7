use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Map, Value};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{authz, models, routes};

#[derive(OpenApi)]
#[openapi(
	paths(
		routes::health::health,
		routes::access::grant_access,
		routes::access::revoke_access,
		routes::access::update_access_role,
		routes::access::get_effective_role,
		routes::access::list_accessible_resources,
		routes::access::list_resource_principals,
		routes::access::list_provider_users,
		routes::access::grant_provider_user,
		routes::access::update_provider_user,
		routes::access::revoke_provider_user,
		routes::folders::list_folders,
		routes::folders::create_folder,
		routes::folders::get_folder,
		routes::folders::get_folder_path,
		routes::folders::update_folder,
		routes::folders::delete_folder,
		routes::workflows::create_workflow,
		routes::workflows::get_workflow,
		routes::workflows::move_workflow,
		routes::workflows::delete_workflow
	),
	components(
		schemas(
			authz::Role,
			authz::PrincipalType,
			authz::ResourceType,
			models::access::AccessTuple,
			models::access::ResolvedAccess,
			models::access::AccessGrantRequest,
			models::access::AccessRoleUpdateRequest,
			models::access::EffectiveRoleResponse,
			models::provider::ProviderAccessEntry,
			models::provider::ProviderAccessListResponse,
			models::provider::GrantUserProviderAccessRequest,
			models::provider::UpdateAccessRoleRequest,
			models::folder::Folder,
			models::folder::FolderCreateRequest,
			models::folder::FolderUpdateRequest,
			models::folder::FolderWithPath,
			models::workflow::Workflow,
			models::workflow::WorkflowCreateRequest,
			models::workflow::WorkflowMoveRequest,
			routes::health::HealthResponse
		)
	),
	tags(
		(name = "Health", description = "Liveness and database status"),
		(name = "Access", description = "Grants, revocations and effective-role queries"),
		(name = "Folders", description = "Folder hierarchy"),
		(name = "Workflows", description = "Workflow placement")
	)
)]
pub struct ApiDoc;

pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
	let mut doc = serde_json::to_value(&ApiDoc::openapi())?;

	normalize_path_operations(&mut doc);
	ensure_security_components(&mut doc)?;
	ensure_global_security(&mut doc)?;
	ensure_openapi_version(&mut doc)?;
	add_examples(&mut doc);
	ensure_servers(&mut doc, port);

	Ok(serde_json::from_value(doc)?)
}

pub fn swagger_routes(doc: &utoipa::openapi::OpenApi) -> anyhow::Result<Router> {
	let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
		.try_it_out_enabled(true)
		.with_credentials(true)
		.persist_authorization(true);

	let doc_json = Arc::new(serde_json::to_value(doc)?);

	let json_route = get(move || {
		let doc_json = Arc::clone(&doc_json);
		async move { Json((*doc_json).clone()) }
	});

	Ok(Router::new()
		.route("/api-docs/openapi.json", json_route)
		.merge(SwaggerUi::new("/docs").config(swagger_config)))
}

fn root_object(doc: &mut Value) -> anyhow::Result<&mut Map<String, Value>> {
	doc.as_object_mut()
		.ok_or_else(|| anyhow::anyhow!("OpenAPI root must be an object"))
}

fn normalize_path_operations(doc: &mut Value) {
	if let Some(paths) = doc.get_mut("paths").and_then(Value::as_object_mut) {
		let snapshot = paths.clone();
		for (path, item) in snapshot {
			if let Some(ops) = item.as_object() {
				let mut normalized = Map::new();
				for (method, val) in ops {
					let key = method.to_lowercase();
					if let Some(existing) = normalized.get_mut(&key) {
						merge_values(existing, val);
					} else {
						normalized.insert(key, val.clone());
					}
				}
				paths.insert(path, Value::Object(normalized));
			}
		}
	}
}

fn ensure_security_components(doc: &mut Value) -> anyhow::Result<()> {
	let components = root_object(doc)?
		.entry("components")
		.or_insert_with(|| Value::Object(Map::new()))
		.as_object_mut()
		.ok_or_else(|| anyhow::anyhow!("components must be an object"))?;

	let schemes = components
		.entry("securitySchemes")
		.or_insert_with(|| Value::Object(Map::new()))
		.as_object_mut()
		.ok_or_else(|| anyhow::anyhow!("securitySchemes must be an object"))?;

	schemes.insert(
		"bearerAuth".to_string(),
		json!({
			"type": "http",
			"scheme": "bearer",
			"bearerFormat": "JWT"
		}),
	);

	Ok(())
}

fn ensure_global_security(doc: &mut Value) -> anyhow::Result<()> {
	root_object(doc)?
		.entry("security")
		.or_insert_with(|| json!([{ "bearerAuth": [] }]));
	Ok(())
}

fn ensure_openapi_version(doc: &mut Value) -> anyhow::Result<()> {
	root_object(doc)?
		.entry("openapi")
		.or_insert_with(|| Value::String("3.1.0".to_string()));
	Ok(())
}

const EXAMPLE_FOLDER: &str = "3f0c6b1e-8d7a-4f0e-9a51-2b7d5c1e9f00";
const EXAMPLE_WORKFLOW: &str = "9b2e4d71-5c3a-4e8b-8f16-0d4a7e6c2b11";
const EXAMPLE_USER: &str = "5d8f2a93-1b4c-4d6e-a7f0-c3e9b1d2f422";
const EXAMPLE_NAMESPACE: &str = "00000000-0000-0000-0000-000000000001";

fn add_examples(doc: &mut Value) {
	if let Some(paths) = doc.get_mut("paths").and_then(Value::as_object_mut) {
		for item in paths.values_mut() {
			if let Some(operations) = item.as_object_mut() {
				for operation in operations.values_mut() {
					apply_request_examples(operation);
					apply_response_examples(operation);
				}
			}
		}
	}
}

fn apply_request_examples(operation: &mut Value) {
	let Some(request_body) = operation.get_mut("requestBody") else { return; };
	let Some(content) = request_body.get_mut("content").and_then(Value::as_object_mut) else { return; };
	let Some(app_json) = content.get_mut("application/json").and_then(Value::as_object_mut) else { return; };
	let Some(schema) = app_json.get("schema").and_then(Value::as_object) else { return; };
	let Some(reference) = schema.get("$ref").and_then(Value::as_str) else { return; };

	let example = match reference {
		"#/components/schemas/AccessGrantRequest" => Some(json!({
			"principal_type": "USER",
			"principal_id": EXAMPLE_USER,
			"resource_type": "FOLDER",
			"resource_id": EXAMPLE_FOLDER,
			"role": "OWNER"
		})),
		"#/components/schemas/FolderCreateRequest" => Some(json!({
			"namespace_id": EXAMPLE_NAMESPACE,
			"name": "Marketing automations",
			"parent_folder_id": null
		})),
		"#/components/schemas/FolderUpdateRequest" => Some(json!({
			"parent_folder_id": EXAMPLE_FOLDER
		})),
		"#/components/schemas/WorkflowCreateRequest" => Some(json!({
			"namespace_id": EXAMPLE_NAMESPACE,
			"name": "Nightly sync",
			"parent_folder_id": EXAMPLE_FOLDER
		})),
		_ => None,
	};

	if let Some(example) = example {
		app_json.insert("example".to_string(), example);
	}
}

fn resolved_access_example() -> Value {
	json!({
		"principal_type": "USER",
		"principal_id": EXAMPLE_USER,
		"resource_type": "WORKFLOW",
		"resource_id": EXAMPLE_WORKFLOW,
		"role": "OWNER",
		"inherited_from": EXAMPLE_FOLDER
	})
}

fn apply_response_examples(operation: &mut Value) {
	let Some(responses) = operation.get_mut("responses").and_then(Value::as_object_mut) else { return; };

	for response in responses.values_mut() {
		let Some(content) = response.get_mut("content").and_then(Value::as_object_mut) else { continue; };
		let Some(app_json) = content.get_mut("application/json").and_then(Value::as_object_mut) else { continue; };
		let Some(schema) = app_json.get("schema").cloned() else { continue; };

		let single = schema.get("$ref").and_then(Value::as_str);
		let item = schema
			.get("items")
			.and_then(|items| items.get("$ref"))
			.and_then(Value::as_str);

		let example = match (single, item) {
			(Some("#/components/schemas/ResolvedAccess"), _) => Some(resolved_access_example()),
			(_, Some("#/components/schemas/ResolvedAccess")) => Some(json!([resolved_access_example()])),
			(Some("#/components/schemas/EffectiveRoleResponse"), _) => Some(json!({
				"resource_type": "WORKFLOW",
				"resource_id": EXAMPLE_WORKFLOW,
				"role": "OWNER",
				"inherited_from": EXAMPLE_FOLDER
			})),
			_ => None,
		};

		if let Some(example) = example {
			app_json.insert("example".to_string(), example);
		}
	}
}

fn ensure_servers(doc: &mut Value, port: u16) {
	let server_url = format!("http://localhost:{}", port);

	match doc.get_mut("servers") {
		Some(Value::Array(arr)) => {
			let has = arr.iter().any(|v| v.get("url").and_then(Value::as_str) == Some(server_url.as_str()));
			if !has {
				arr.push(json!({ "url": server_url }));
			}
		}
		_ => {
			doc["servers"] = json!([{ "url": server_url }]);
		}
	}
}

fn merge_values(target: &mut Value, addition: &Value) {
	match (target, addition) {
		(Value::Object(dest), Value::Object(src)) => {
			for (key, value) in src {
				if let Some(existing) = dest.get_mut(key) {
					merge_values(existing, value);
				} else {
					dest.insert(key.clone(), value.clone());
				}
			}
		}
		(Value::Array(dest), Value::Array(src)) => {
			for item in src {
				if !dest.contains(item) {
					dest.push(item.clone());
				}
			}
		}
		_ => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn document_lists_access_paths_and_bearer_scheme() {
		let doc = build_openapi(8000).unwrap();
		let value = serde_json::to_value(&doc).unwrap();

		assert!(value["paths"]["/access/grant"]["post"].is_object());
		assert!(value["paths"]["/folders/{id}"]["patch"].is_object());
		assert_eq!(value["components"]["securitySchemes"]["bearerAuth"]["scheme"], "bearer");
		assert_eq!(value["servers"][0]["url"], "http://localhost:8000");
	}
}
