/// Coordinates of a managed PostgreSQL instance.
///
/// Connections are expected to go through the vendor's Auth Proxy listening
/// on `DATABASE_HOST:DATABASE_PORT`; the address identifies the target in
/// logs and in the session's `application_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceAddress {
    AlloyDb {
        project: String,
        region: String,
        cluster: String,
        instance: String,
    },
    CloudSql {
        project: String,
        region: String,
        instance: String,
    },
}

impl InstanceAddress {
    /// Parse `projects/P/locations/R/clusters/C/instances/I`.
    pub fn parse_alloydb(s: &str) -> Result<Self, String> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        match parts.as_slice() {
            ["projects", project, "locations", region, "clusters", cluster, "instances", instance]
                if [project, region, cluster, instance].iter().all(|p| !p.is_empty()) =>
            {
                Ok(Self::AlloyDb {
                    project: project.to_string(),
                    region: region.to_string(),
                    cluster: cluster.to_string(),
                    instance: instance.to_string(),
                })
            }
            _ => Err(format!(
                "invalid AlloyDB instance URI '{s}', expected \
                 'projects/<project>/locations/<region>/clusters/<cluster>/instances/<instance>'"
            )),
        }
    }

    /// Parse a Cloud SQL connection name `project:region:instance`.
    pub fn parse_cloudsql(s: &str) -> Result<Self, String> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        match parts.as_slice() {
            [project, region, instance] if parts.iter().all(|p| !p.is_empty()) => {
                Ok(Self::CloudSql {
                    project: project.to_string(),
                    region: region.to_string(),
                    instance: instance.to_string(),
                })
            }
            _ => Err(format!(
                "invalid Cloud SQL connection name '{s}', expected '<project>:<region>:<instance>'"
            )),
        }
    }

    /// Canonical connection name for the instance.
    pub fn connection_name(&self) -> String {
        match self {
            Self::AlloyDb {
                project,
                region,
                cluster,
                instance,
            } => format!(
                "projects/{project}/locations/{region}/clusters/{cluster}/instances/{instance}"
            ),
            Self::CloudSql {
                project,
                region,
                instance,
            } => format!("{project}:{region}:{instance}"),
        }
    }

    /// Short instance name.
    pub fn instance_id(&self) -> &str {
        match self {
            Self::AlloyDb { instance, .. } | Self::CloudSql { instance, .. } => instance,
        }
    }
}

impl std::fmt::Display for InstanceAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.connection_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloydb_uri_roundtrips() {
        let uri = "projects/acme/locations/us-central1/clusters/main/instances/primary";
        let addr = InstanceAddress::parse_alloydb(uri).unwrap();
        assert_eq!(addr.instance_id(), "primary");
        assert_eq!(addr.connection_name(), uri);
    }

    #[test]
    fn alloydb_uri_rejects_wrong_shape() {
        assert!(InstanceAddress::parse_alloydb("projects/acme/instances/primary").is_err());
        assert!(
            InstanceAddress::parse_alloydb("projects//locations/r/clusters/c/instances/i").is_err()
        );
    }

    #[test]
    fn cloudsql_connection_name() {
        let addr = InstanceAddress::parse_cloudsql("acme:europe-west1:chat-db").unwrap();
        assert_eq!(
            addr,
            InstanceAddress::CloudSql {
                project: "acme".to_string(),
                region: "europe-west1".to_string(),
                instance: "chat-db".to_string(),
            }
        );
        assert_eq!(addr.to_string(), "acme:europe-west1:chat-db");
        assert!(InstanceAddress::parse_cloudsql("acme:chat-db").is_err());
        assert!(InstanceAddress::parse_cloudsql("acme::chat-db").is_err());
    }
}
