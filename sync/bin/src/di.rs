use shaku::{module, HasComponent};
use std::sync::Arc;
use sync_application::sync_service::SyncServiceImplParameters;
use sync_application::{
    ApiHealthProbe, Archiver, HealthChecker, StatusService, StatusServiceImpl, SyncService,
    SyncServiceImpl,
};
use sync_infrastructure::archive::TarGzArchiverParameters;
use sync_infrastructure::detectors::ParquetGapDetectorParameters;
use sync_infrastructure::gateways::TushareGatewayParameters;
use sync_infrastructure::rate_limiting::JitterRateLimiterParameters;
use sync_infrastructure::repositories::ParquetBarRepositoryParameters;
use sync_infrastructure::state::{
    FileSyncLockParameters, JsonMetadataStoreParameters, JsonProgressStoreParameters,
};
use sync_infrastructure::{
    FileSyncLock, JitterRateLimiter, JsonMetadataStore, JsonProgressStore, MockMarketDataGateway,
    ParquetBarRepository, ParquetGapDetector, TarGzArchiver, TushareGateway,
};

use crate::config::{AppConfig, Provider};

module! {
    pub TushareModule {
        components = [
            JitterRateLimiter,
            TushareGateway,
            ApiHealthProbe,
            ParquetBarRepository,
            ParquetGapDetector,
            JsonProgressStore,
            JsonMetadataStore,
            FileSyncLock,
            TarGzArchiver,
            SyncServiceImpl,
            StatusServiceImpl
        ],
        providers = []
    }
}

module! {
    pub MockModule {
        components = [
            JitterRateLimiter,
            MockMarketDataGateway,
            ApiHealthProbe,
            ParquetBarRepository,
            ParquetGapDetector,
            JsonProgressStore,
            JsonMetadataStore,
            FileSyncLock,
            TarGzArchiver,
            SyncServiceImpl,
            StatusServiceImpl
        ],
        providers = []
    }
}

/// Services the CLI needs, resolved from whichever module the provider picks.
pub struct App {
    pub sync: Arc<dyn SyncService>,
    pub status: Arc<dyn StatusService>,
    pub archiver: Arc<dyn Archiver>,
    pub health: Arc<dyn HealthChecker>,
}

/// Parameters shared by both modules; only the gateway differs.
macro_rules! with_storage_parameters {
    ($builder:expr, $config:expr) => {{
        let data_dir = $config.data_dir.clone();
        $builder
            .with_component_parameters::<JitterRateLimiter>(JitterRateLimiterParameters {
                config: $config.rate_limit.clone(),
                ..Default::default()
            })
            .with_component_parameters::<ParquetBarRepository>(ParquetBarRepositoryParameters {
                data_dir: data_dir.clone(),
                ..Default::default()
            })
            .with_component_parameters::<ParquetGapDetector>(ParquetGapDetectorParameters {
                data_dir: data_dir.clone(),
            })
            .with_component_parameters::<JsonProgressStore>(JsonProgressStoreParameters {
                data_dir: data_dir.clone(),
                ..Default::default()
            })
            .with_component_parameters::<JsonMetadataStore>(JsonMetadataStoreParameters {
                data_dir: data_dir.clone(),
            })
            .with_component_parameters::<FileSyncLock>(FileSyncLockParameters {
                data_dir: data_dir.clone(),
            })
            .with_component_parameters::<TarGzArchiver>(TarGzArchiverParameters { data_dir })
            .with_component_parameters::<SyncServiceImpl>(SyncServiceImplParameters {
                settings: $config.sync.clone(),
                ..Default::default()
            })
    }};
}

pub fn create_app(config: &AppConfig) -> App {
    match config.provider {
        Provider::Tushare => {
            let module = with_storage_parameters!(TushareModule::builder(), config)
                .with_component_parameters::<TushareGateway>(TushareGatewayParameters {
                    config: config.tushare.clone(),
                    ..Default::default()
                })
                .build();
            resolve(&module)
        }
        Provider::Mock => {
            let module = with_storage_parameters!(MockModule::builder(), config).build();
            resolve(&module)
        }
    }
}

fn resolve<M>(module: &M) -> App
where
    M: HasComponent<dyn SyncService>
        + HasComponent<dyn StatusService>
        + HasComponent<dyn Archiver>
        + HasComponent<dyn HealthChecker>,
{
    App {
        sync: <M as HasComponent<dyn SyncService>>::resolve(module),
        status: <M as HasComponent<dyn StatusService>>::resolve(module),
        archiver: <M as HasComponent<dyn Archiver>>::resolve(module),
        health: <M as HasComponent<dyn HealthChecker>>::resolve(module),
    }
}
