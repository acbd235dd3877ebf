//! Built-in gallery of common architecture patterns.

use serde::Serialize;

use crate::helpers::find_similar;
use crate::models::{ArchitectureType, CloudProvider, RequestError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Template {
    pub name: &'static str,
    pub description: &'static str,
    pub architecture_type: ArchitectureType,
    pub cloud_provider: Option<CloudProvider>,
    pub components: &'static str,
}

pub const TEMPLATES: &[Template] = &[
    Template {
        name: "Three-Tier Web Application (AWS)",
        description: "A scalable three-tier web application with load balancing, application servers, and database",
        architecture_type: ArchitectureType::Cloud,
        cloud_provider: Some(CloudProvider::Aws),
        components: "ALB, EC2 instances, RDS, S3, CloudFront",
    },
    Template {
        name: "Microservices Architecture (Kubernetes)",
        description: "Modern microservices architecture with API gateway, multiple services, message queue, and monitoring",
        architecture_type: ArchitectureType::Microservices,
        cloud_provider: Some(CloudProvider::Gcp),
        components: "GKE, Cloud Load Balancer, Cloud SQL, Pub/Sub, Cloud Monitoring",
    },
    Template {
        name: "Serverless Application (AWS)",
        description: "Serverless architecture using Lambda functions, API Gateway, DynamoDB, and S3",
        architecture_type: ArchitectureType::Serverless,
        cloud_provider: Some(CloudProvider::Aws),
        components: "API Gateway, Lambda, DynamoDB, S3, CloudWatch, Cognito",
    },
    Template {
        name: "Data Pipeline (AWS)",
        description: "Data processing pipeline with ingestion, transformation, storage, and analytics",
        architecture_type: ArchitectureType::Data,
        cloud_provider: Some(CloudProvider::Aws),
        components: "S3, Kinesis, Lambda, Glue, Redshift, Athena, QuickSight",
    },
    Template {
        name: "Event-Driven Architecture (Azure)",
        description: "Event-driven system with event hub, functions, and storage",
        architecture_type: ArchitectureType::EventDriven,
        cloud_provider: Some(CloudProvider::Azure),
        components: "Event Hub, Azure Functions, Cosmos DB, Storage Account, Service Bus",
    },
    Template {
        name: "Machine Learning Pipeline (GCP)",
        description: "ML pipeline with training, deployment, and inference components",
        architecture_type: ArchitectureType::Ml,
        cloud_provider: Some(CloudProvider::Gcp),
        components: "Vertex AI, Cloud Storage, BigQuery, Cloud Run, Pub/Sub",
    },
    Template {
        name: "Multi-Region High Availability (AWS)",
        description: "Multi-region architecture with failover, replication, and global load balancing",
        architecture_type: ArchitectureType::Cloud,
        cloud_provider: Some(CloudProvider::Aws),
        components: "Route 53, CloudFront, ALB, EC2 Auto Scaling, RDS Multi-AZ, S3 Cross-Region Replication",
    },
    Template {
        name: "CI/CD Pipeline",
        description: "Complete CI/CD pipeline with source control, build, test, and deployment stages",
        architecture_type: ArchitectureType::Devops,
        cloud_provider: Some(CloudProvider::Aws),
        components: "GitHub, CodePipeline, CodeBuild, CodeDeploy, ECS, CloudWatch",
    },
];

pub fn template_names() -> Vec<&'static str> {
    TEMPLATES.iter().map(|t| t.name).collect()
}

/// Case-insensitive lookup by full name.
pub fn get_template(name: &str) -> Result<&'static Template, RequestError> {
    let wanted = name.trim();
    TEMPLATES
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(wanted))
        .ok_or_else(|| RequestError::UnknownTemplate {
            name: wanted.to_string(),
            suggestion: find_similar(wanted, &template_names()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gallery_has_eight_unique_names() {
        let mut names = template_names();
        assert_eq!(names.len(), 8);
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 8);
    }

    #[test]
    fn test_get_template_ignores_case() {
        let template = get_template("data pipeline (aws)").unwrap();
        assert_eq!(template.name, "Data Pipeline (AWS)");
        assert_eq!(template.architecture_type, ArchitectureType::Data);
        assert_eq!(template.cloud_provider, Some(CloudProvider::Aws));
    }

    #[test]
    fn test_unknown_template_suggests() {
        let err = get_template("Serverless Application").unwrap_err();
        match &err {
            RequestError::UnknownTemplate { suggestion, .. } => {
                assert_eq!(suggestion.as_deref(), Some("Serverless Application (AWS)"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("Did you mean"));

        let err = get_template("zzz").unwrap_err();
        assert_eq!(
            err,
            RequestError::UnknownTemplate {
                name: "zzz".to_string(),
                suggestion: None
            }
        );
    }
}
