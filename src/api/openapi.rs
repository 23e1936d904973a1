//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{allocation, equipment, equipment_types, events, health, jobs, locations};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Wellstock API",
        version = "0.4.0",
        description = "Oilfield equipment tracking and allocation REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html"),
        contact(name = "Wellstock Maintainers", email = "dev@wellstock.io")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Equipment types
        equipment_types::list_types,
        equipment_types::get_type,
        equipment_types::create_type,
        equipment_types::update_type,
        equipment_types::delete_type,
        equipment_types::next_id,
        // Locations
        locations::list_locations,
        locations::get_default_location,
        locations::get_location,
        locations::create_location,
        locations::update_location,
        locations::set_default_location,
        locations::delete_location,
        // Equipment
        equipment::list_individual,
        equipment::get_individual,
        equipment::create_individual,
        equipment::update_individual,
        equipment::delete_individual,
        equipment::red_tag_individual,
        equipment::lift_red_tag_individual,
        equipment::transfer_individual,
        equipment::list_bulk,
        equipment::get_bulk,
        equipment::create_bulk,
        equipment::update_bulk,
        equipment::delete_bulk,
        equipment::red_tag_bulk,
        equipment::lift_red_tag_bulk,
        equipment::transfer_bulk,
        equipment::consolidate,
        equipment::equipment_status,
        // Jobs
        jobs::list_jobs,
        jobs::get_job,
        jobs::create_job,
        jobs::update_job,
        jobs::delete_job,
        jobs::sync_equipment,
        jobs::job_allocations,
        // Allocations
        allocation::validate,
        allocation::allocate,
        allocation::release,
        allocation::list_conflicts,
        allocation::resolve_conflict,
        allocation::resync,
        // Events
        events::equipment_events,
    ),
    components(
        schemas(
            // Enums
            crate::models::enums::EquipmentStatus,
            crate::models::enums::AllocationStatus,
            crate::models::enums::EquipmentCategory,
            crate::models::enums::ChangeOp,
            // Equipment types
            crate::models::equipment_type::EquipmentType,
            crate::models::equipment_type::CreateEquipmentType,
            crate::models::equipment_type::UpdateEquipmentType,
            equipment_types::NextIdResponse,
            // Locations
            crate::models::location::StorageLocation,
            crate::models::location::CreateStorageLocation,
            crate::models::location::UpdateStorageLocation,
            // Equipment
            crate::models::equipment::IndividualEquipment,
            crate::models::equipment::BulkEquipment,
            crate::models::equipment::CreateIndividualEquipment,
            crate::models::equipment::UpdateIndividualEquipment,
            crate::models::equipment::CreateBulkEquipment,
            crate::models::equipment::UpdateBulkEquipment,
            crate::models::equipment::RedTagRequest,
            crate::models::equipment::TransferRequest,
            equipment::ConsolidateResponse,
            // Jobs
            crate::models::job::Job,
            crate::models::job::EquipmentManifest,
            crate::models::job::CreateJob,
            crate::models::job::UpdateJob,
            // Allocations
            crate::models::allocation::EquipmentAllocation,
            crate::models::allocation::EquipmentConflict,
            crate::models::allocation::ConflictResolution,
            crate::models::allocation::BatchOutcome,
            crate::models::allocation::AllocationRequest,
            crate::models::allocation::ReleaseRequest,
            crate::models::allocation::ResolveConflictRequest,
            crate::models::allocation::ValidationOutcome,
            crate::models::allocation::EquipmentStatusResponse,
            crate::models::allocation::EquipmentChange,
            allocation::ResolveConflictResponse,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "equipment-types", description = "Equipment type catalog"),
        (name = "locations", description = "Storage locations"),
        (name = "equipment", description = "Individual and bulk equipment"),
        (name = "jobs", description = "Field jobs and their manifests"),
        (name = "allocations", description = "Equipment allocation and conflicts"),
        (name = "events", description = "Realtime change feed")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
