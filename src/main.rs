//! Oracion - 祈祷文朗读系统
//!
//! 组装根：加载配置、初始化日志、打开 Sled、装配适配器与处理器，
//! 然后执行一个子命令。

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;

use oracion::application::playback::{PlaybackMode, PlaybackSequencer};
use oracion::application::ports::{AudioCodecPort, TtsEnginePort};
use oracion::application::{
    AddPrayerCommand, AddPrayerHandler, ClearCacheCommand, ClearCacheHandler,
    DeleteCachedAudioCommand, DeleteCachedAudioHandler, ExportAudioCommand, ExportAudioHandler,
    GetCacheStatusHandler, GetCacheStatusQuery, GetPlaybackStatusHandler, GetPlaybackStatusQuery,
    GetPrayerHandler, GetPrayerQuery, ListCachedAudioHandler, ListCachedAudioQuery,
    ListPrayersHandler, ListPrayersQuery, PlayPrayerCommand, PlayPrayerHandler, PrayerRegistry,
    RemovePrayerCommand, RemovePrayerHandler, StopPlaybackCommand, StopPlaybackHandler,
};
use oracion::config::{load_config_from_path, print_config, AppConfig, TtsBackend};
use oracion::domain::prayer::{PrayerId, DEFAULT_PRAYER_ID};
use oracion::infrastructure::adapters::{
    ClockedSink, FakeTtsClient, HttpTtsClient, HttpTtsClientConfig, SymphoniaCodec,
};
use oracion::infrastructure::events::{EventPublisher, PlaybackEvent};
use oracion::infrastructure::persistence::{open_database, SledAudioCache, SledPrayerStore};

#[derive(Parser, Debug)]
#[command(name = "oracion")]
#[command(about = "Narrate prayers through a TTS proxy")]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认搜索 config.toml / config.local.toml）
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 列出全部祈祷文
    List,
    /// 显示一篇祈祷文
    Show { id: String },
    /// 朗读一篇祈祷文（默认 salmo23）
    Play {
        id: Option<String>,
        /// merge 或 sequence，覆盖配置
        #[arg(long)]
        mode: Option<PlaybackMode>,
    },
    /// 添加自定义祈祷文
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        text: String,
    },
    /// 删除自定义祈祷文及其缓存音频
    Remove { id: String },
    /// 列出缓存音频
    Cache,
    /// 删除一条缓存音频
    DeleteCache { id: String },
    /// 清空缓存
    ClearCache,
    /// 把缓存音频导出为 `<标题>.wav`
    Export {
        id: String,
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

fn init_tracing(config: &AppConfig) {
    let log_filter = format!("{},oracion={}", config.log.level, config.log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config_from_path(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);
    print_config(&config);

    if let Some(parent) = config.storage.db_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let db = open_database(&config.storage.db_path)?;
    let audio_cache = SledAudioCache::new(&db)?.arc();
    let prayer_store = Arc::new(SledPrayerStore::new(&db)?);
    let registry = PrayerRegistry::new(prayer_store).arc();
    let codec: Arc<dyn AudioCodecPort> = Arc::new(SymphoniaCodec::new());
    let event_publisher = EventPublisher::new().arc();

    let command = cli.command.unwrap_or(Command::Play {
        id: None,
        mode: None,
    });

    match command {
        Command::List => {
            let response = ListPrayersHandler::new(registry, audio_cache)
                .handle(ListPrayersQuery)
                .await?;
            for item in response.prayers {
                let marker = if item.cached { "✅" } else { "  " };
                println!("{} {:<20} {}", marker, item.prayer.id, item.prayer.title);
            }
        }
        Command::Show { id } => {
            let prayer_id = PrayerId::new(id);
            let response = GetPrayerHandler::new(registry)
                .handle(GetPrayerQuery {
                    prayer_id: prayer_id.clone(),
                })
                .await?;
            let status = GetCacheStatusHandler::new(audio_cache)
                .handle(GetCacheStatusQuery { prayer_id })
                .await?;

            println!("{}\n", response.prayer.title);
            println!("{}\n", response.prayer.text);
            println!("{} caracteres", response.char_count);
            if let Some(label) = status.label() {
                println!("{}", label);
            }
        }
        Command::Play { id, mode } => {
            let tts = build_tts(&config)?;
            let sink = Arc::new(ClockedSink::new(codec.clone(), config.playback.speed));
            let sequencer = PlaybackSequencer::new(sink, event_publisher.clone()).arc();
            let handler = PlayPrayerHandler::new(
                registry,
                tts,
                codec,
                audio_cache,
                sequencer.clone(),
                event_publisher.clone(),
                mode.unwrap_or(config.playback.mode),
            );

            // 状态栏消息输出到终端
            let mut events = event_publisher.subscribe_global();
            let printer = tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(PlaybackEvent::Status { message, .. }) if !message.is_empty() => {
                            println!("{}", message)
                        }
                        Ok(PlaybackEvent::Progress { percent, .. }) => {
                            tracing::debug!(percent = percent, "Progress")
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => break,
                    }
                }
            });

            let prayer_id = PrayerId::new(id.unwrap_or_else(|| DEFAULT_PRAYER_ID.to_string()));
            let response = handler.handle(PlayPrayerCommand { prayer_id }).await;

            match response {
                Ok(response) if response.started => {
                    tracing::info!(
                        session_id = %response.session_id,
                        units = response.units,
                        from_cache = response.from_cache,
                        "Waiting for playback to finish"
                    );
                    tokio::select! {
                        _ = sequencer.wait() => {}
                        _ = tokio::signal::ctrl_c() => {
                            tracing::info!("Received shutdown signal");
                            let stopped = StopPlaybackHandler::new(sequencer.clone())
                                .handle(StopPlaybackCommand)
                                .await?;
                            tracing::info!(was_active = stopped.was_active, "Playback stopped");
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    printer.abort();
                    eprintln!("{}", e.user_message());
                    return Err(e.into());
                }
            }

            // 让最后的状态消息打印出来
            tokio::task::yield_now().await;
            printer.abort();

            let snapshot = GetPlaybackStatusHandler::new(sequencer).handle(GetPlaybackStatusQuery);
            tracing::info!(
                state = snapshot.state.as_str(),
                progress = snapshot.progress,
                "Playback finished"
            );
        }
        Command::Add { title, text } => {
            let response = AddPrayerHandler::new(registry, event_publisher)
                .handle(AddPrayerCommand { title, text })
                .await?;
            println!("{} {}", response.prayer.id, response.prayer.title);
        }
        Command::Remove { id } => {
            let response = RemovePrayerHandler::new(registry, audio_cache, event_publisher)
                .handle(RemovePrayerCommand {
                    prayer_id: PrayerId::new(id),
                })
                .await?;
            println!(
                "removed {} (cached audio deleted: {})",
                response.prayer_id, response.cache_deleted
            );
        }
        Command::Cache => {
            let response = ListCachedAudioHandler::new(audio_cache, codec)
                .handle(ListCachedAudioQuery)
                .await?;
            for entry in &response.entries {
                println!(
                    "{:<20} {:<24} {:>8} B  {}",
                    entry.prayer_id,
                    entry.title,
                    entry.size_bytes,
                    entry.created_at.format("%d/%m/%Y %H:%M")
                );
            }
            println!("{} audios, {}", response.count, response.total_size_label());
        }
        Command::DeleteCache { id } => {
            let response = DeleteCachedAudioHandler::new(audio_cache, event_publisher)
                .handle(DeleteCachedAudioCommand {
                    prayer_id: PrayerId::new(id),
                })
                .await?;
            println!("deleted {} (existed: {})", response.prayer_id, response.existed);
        }
        Command::ClearCache => {
            let response = ClearCacheHandler::new(audio_cache, event_publisher)
                .handle(ClearCacheCommand)
                .await?;
            println!(
                "cleared {} audios ({} bytes)",
                response.removed, response.freed_bytes
            );
        }
        Command::Export { id, dir } => {
            let response = ExportAudioHandler::new(audio_cache, event_publisher)
                .handle(ExportAudioCommand {
                    prayer_id: PrayerId::new(id),
                    dir: dir.unwrap_or_else(|| config.storage.export_dir.clone()),
                })
                .await?;
            println!("{} ({} bytes)", response.path.display(), response.size_bytes);
        }
    }

    db.flush_async().await?;
    Ok(())
}

fn build_tts(config: &AppConfig) -> anyhow::Result<Arc<dyn TtsEnginePort>> {
    let tts: Arc<dyn TtsEnginePort> = match config.tts.backend {
        TtsBackend::Http => {
            let client_config = HttpTtsClientConfig::new(config.tts.url.clone())
                .with_timeout(config.tts.timeout_secs)
                .with_chunk_mime(config.tts.chunk_mime_type()?);
            Arc::new(HttpTtsClient::new(client_config)?)
        }
        TtsBackend::Fake => Arc::new(FakeTtsClient::with_defaults()),
    };
    Ok(tts)
}
