use aquasim::logging::{LogConfig, LogOutput, init_logging, parse_log_level};
use aquasim::models::DecorLoader;
use aquasim::scenario::AquariumScenario;
use aquasim::simulation::AquariumEngine;
use clap::{Arg, Command};
use std::str::FromStr;
use tracing::{error, info};

fn main() {
    // コマンドライン引数の解析
    let matches = Command::new("aquasim")
        .version("0.1.0")
        .about("水槽シミュレーション (Aquarium Simulation)")
        .long_about(
            "魚が水槽内を自律遊泳するエージェントシミュレーションです。\n\
             固定時間刻みのヘッドレス実行で、遊泳・衝突回避・給餌の挙動を確認できます。",
        )
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("シナリオファイル(.yaml)のパスを指定")
                .long_help(
                    "実行するシナリオファイル(.yaml)のパスを指定します。\n\
                     指定しない場合、利用可能なシナリオの一覧を表示します。",
                ),
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(clap::ArgAction::SetTrue)
                .help("シナリオの情報のみ表示して終了")
                .conflicts_with("test"),
        )
        .arg(
            Arg::new("test")
                .short('t')
                .long("test")
                .action(clap::ArgAction::SetTrue)
                .help("組み込みシナリオで構築の自己診断を実行")
                .conflicts_with("info"),
        )
        .arg(
            Arg::new("log-level")
                .short('v')
                .long("log-level")
                .value_name("LEVEL")
                .default_value("info")
                .help("ログレベル (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("log-output")
                .short('o')
                .long("log-output")
                .value_name("DEST")
                .default_value("console")
                .help("ログ出力先 (console, file, both)"),
        )
        .get_matches();

    let level = parse_log_level(
        matches
            .get_one::<String>("log-level")
            .map(String::as_str)
            .unwrap_or("info"),
    );
    let output = matches
        .get_one::<String>("log-output")
        .map(String::as_str)
        .and_then(|s| LogOutput::from_str(s).ok())
        .unwrap_or(LogOutput::Console);

    if let Err(e) = init_logging(LogConfig {
        level,
        output,
        ..LogConfig::default()
    }) {
        eprintln!("ログ初期化エラー: {}", e);
        std::process::exit(1);
    }

    info!("水槽シミュレーション (Aquarium Simulation) - aquasim v0.1.0");

    // 自己診断モードの実行
    if matches.get_flag("test") {
        run_self_check();
        return;
    }

    // シナリオファイルの処理
    if let Some(scenario_path) = matches.get_one::<String>("scenario") {
        if let Err(e) = run_scenario(scenario_path, matches.get_flag("info")) {
            error!("エラー: {}", e);
            std::process::exit(1);
        }
    } else {
        show_default_help();
    }
}

/// 組み込みシナリオでエンジン構築を確認する自己診断
fn run_self_check() {
    info!("=== 自己診断モード ===");

    let scenario = AquariumScenario::demo();
    let mut engine = AquariumEngine::new(scenario);
    info!("エンジンが構築されました: 障害物 {}個", engine.obstacles.len());

    // 数フレーム進めて不変条件を目視確認できるログを残す
    let dt = engine.scenario.sim.dt_s;
    for frame in 0..120 {
        engine.update(frame as f32 * dt);
    }
    info!(
        "魚の位置: ({:.2}, {:.2}, {:.2})",
        engine.fish.position.x, engine.fish.position.y, engine.fish.position.z
    );
    info!("方位ノルム: {:.6}", engine.fish.heading.length());

    engine.trigger_feeding();
    for frame in 120..480 {
        engine.update(frame as f32 * dt);
    }
    info!(
        "給餌シーケンス: 起動 {}回, 散布餌粒 {}個",
        engine.stats.feed_triggers, engine.feeding.pellets_dropped_total
    );

    info!("自己診断が完了しました");
}

/// シナリオファイルを読み込んで実行
fn run_scenario(scenario_path: &str, info_only: bool) -> Result<(), Box<dyn std::error::Error>> {
    let scenario = AquariumScenario::from_file(scenario_path)?;
    scenario.log_summary();

    if info_only {
        return Ok(());
    }

    let mut engine = AquariumEngine::new(scenario);

    // 装飾障害物は非同期に読み込み、完了したフレームから衝突対象になる
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .build()?;
    if let Some(decor_file) = engine.scenario.decor_file.clone() {
        let loader = DecorLoader::spawn(runtime.handle(), decor_file.into());
        engine.set_decor_loader(loader);
    }

    engine.run()?;

    Ok(())
}

/// デフォルトヘルプとシナリオ一覧を表示
fn show_default_help() {
    info!("使用方法:");
    info!("  aquasim [オプション]");
    info!("オプション:");
    info!("  -s, --scenario <FILE>   シナリオファイルを指定して実行");
    info!("  -i, --info              シナリオ情報のみ表示");
    info!("  -t, --test              構築の自己診断を実行");
    info!("  -v, --log-level <LEVEL> ログレベルを指定");
    info!("  -o, --log-output <DEST> ログ出力先を指定");
    info!("利用可能なシナリオファイル:");
    info!("  scenarios/aquarium_basic.yaml  - 標準の水槽");
    info!("  scenarios/aquarium_decor.yaml  - 装飾の非同期読み込みあり");
    info!("例:");
    info!("  aquasim -s scenarios/aquarium_basic.yaml");
    info!("  aquasim -s scenarios/aquarium_decor.yaml -v debug");
    info!("  aquasim --test");
}
