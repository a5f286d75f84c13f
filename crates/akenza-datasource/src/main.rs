use akenza_datasource::AkenzaDataSource;

#[grafana_plugin_sdk::main(services(data, diagnostics, resource), init_subscriber = true)]
async fn plugin() -> AkenzaDataSource {
    AkenzaDataSource::new()?
}
