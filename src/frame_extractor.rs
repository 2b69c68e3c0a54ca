use crate::batch::{collect_files, ensure_dir, run_batch, BatchReport};
use crate::config::ExtractConfig;
use crate::error::{PrepError, PrepResult};
use crate::image_io::save_image;
use anyhow::{Context, Result};
use gstreamer::prelude::*;
use gstreamer::{self as gst, ElementFactory};
use gstreamer_app::AppSink;
use image::{imageops, DynamicImage, RgbImage};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 動画情報
#[derive(Debug, Clone)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub duration_sec: f64,
}

impl VideoInfo {
    /// 再生時間と FPS から見積もった総フレーム数
    pub fn estimated_frames(&self) -> u64 {
        (self.duration_sec * self.fps).round().max(0.0) as u64
    }
}

/// 1動画の抽出結果
#[derive(Debug, Clone, Default)]
pub struct ExtractionSummary {
    /// デコードしたフレーム数
    pub decoded_frames: u64,
    /// 保存したフレームのパス（連番順）
    pub saved: Vec<PathBuf>,
    /// 縦長に回転したフレーム数
    pub reoriented_frames: u64,
}

/// 行ごとに `stride` バイトで並んだ RGB データから画像を作る
///
/// 行末のパディングは捨てる。バッファが足りない場合はエラー。
pub fn copy_rgb_rows(data: &[u8], width: u32, height: u32, stride: usize) -> Result<RgbImage> {
    let row_bytes = width as usize * 3;
    if width == 0
        || height == 0
        || stride < row_bytes
        || data.len() < stride * (height as usize - 1) + row_bytes
    {
        anyhow::bail!(
            "フレームバッファのサイズが不正です: {}x{}, stride {}, {} バイト",
            width,
            height,
            stride,
            data.len()
        );
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in data.chunks(stride).take(height as usize) {
        pixels.extend_from_slice(&row[..row_bytes]);
    }

    RgbImage::from_raw(width, height, pixels).context("RGB画像の生成に失敗しました")
}

/// 先頭から順にフレームを返すデコーダ
///
/// シークはしない。`Ok(None)` でストリーム終端。
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;
}

/// GStreamerを初期化
fn init_gstreamer() -> Result<()> {
    gst::init().context("GStreamerの初期化に失敗しました")?;
    Ok(())
}

fn file_uri(path: &Path) -> Result<String> {
    let absolute = path
        .canonicalize()
        .with_context(|| format!("動画ファイルのパスを解決できませんでした: {}", path.display()))?;
    let uri = gst::glib::filename_to_uri(&absolute, None)
        .context("動画ファイルのURIを生成できませんでした")?;
    Ok(uri.to_string())
}

/// 動画ファイルの情報を取得
pub fn probe_video(video_path: &Path) -> Result<VideoInfo> {
    init_gstreamer()?;

    let uri = file_uri(video_path)?;

    let discoverer = gstreamer_pbutils::Discoverer::new(gst::ClockTime::from_seconds(10))
        .context("Discovererの作成に失敗しました")?;
    let info = discoverer
        .discover_uri(&uri)
        .context("動画の解析に失敗しました")?;

    let video_streams = info.video_streams();
    let Some(video_stream) = video_streams.first() else {
        anyhow::bail!("動画ストリームが見つかりません");
    };

    let framerate = video_stream.framerate();
    let fps = if framerate.denom() != 0 {
        framerate.numer() as f64 / framerate.denom() as f64
    } else {
        0.0
    };

    let duration_sec = info
        .duration()
        .map(|dur| dur.nseconds() as f64 / 1_000_000_000.0)
        .unwrap_or(0.0);

    Ok(VideoInfo {
        width: video_stream.width(),
        height: video_stream.height(),
        fps,
        duration_sec,
    })
}

/// GStreamerパイプラインによる逐次デコード
///
/// `filesrc ! decodebin ! videoconvert ! appsink(RGB)`。
/// Drop でパイプラインを Null に戻すため、途中でエラー終了してもハンドルは解放される。
pub struct GstFrameSource {
    pipeline: gst::Pipeline,
    appsink: AppSink,
    bus: gst::Bus,
    finished: bool,
}

impl GstFrameSource {
    pub fn open(video_path: &Path) -> Result<Self> {
        init_gstreamer()?;

        let location = video_path
            .to_str()
            .with_context(|| format!("動画パスが UTF-8 ではありません: {}", video_path.display()))?;

        let pipeline = gst::Pipeline::new();

        let source = ElementFactory::make("filesrc")
            .name("source")
            .property("location", location)
            .build()
            .context("filesrcの作成に失敗しました")?;

        let decodebin = ElementFactory::make("decodebin")
            .name("decoder")
            .build()
            .context("decodebinの作成に失敗しました")?;

        let videoconvert = ElementFactory::make("videoconvert")
            .name("converter")
            .build()
            .context("videoconvertの作成に失敗しました")?;

        let appsink = ElementFactory::make("appsink")
            .name("sink")
            .build()
            .context("appsinkの作成に失敗しました")?
            .dynamic_cast::<AppSink>()
            .map_err(|_| anyhow::anyhow!("appsinkへのキャストに失敗しました"))?;

        appsink.set_caps(Some(
            &gst::Caps::builder("video/x-raw")
                .field("format", "RGB")
                .build(),
        ));
        appsink.set_property("emit-signals", false);
        appsink.set_property("sync", false);

        pipeline
            .add_many([
                &source,
                &decodebin,
                &videoconvert,
                appsink.upcast_ref::<gst::Element>(),
            ])
            .context("エレメントの追加に失敗しました")?;

        source
            .link(&decodebin)
            .context("sourceとdecoderのリンクに失敗しました")?;
        videoconvert
            .link(&appsink)
            .context("converterとsinkのリンクに失敗しました")?;

        // decodebinの動的パッドをリンク（映像のみ）
        let videoconvert_weak = videoconvert.downgrade();
        decodebin.connect_pad_added(move |_src, src_pad| {
            let Some(videoconvert) = videoconvert_weak.upgrade() else {
                return;
            };
            let Some(sink_pad) = videoconvert.static_pad("sink") else {
                return;
            };
            if sink_pad.is_linked() {
                return;
            }
            let is_video = src_pad
                .current_caps()
                .and_then(|caps| caps.structure(0).map(|s| s.name().starts_with("video/")))
                .unwrap_or(false);
            if !is_video {
                return;
            }
            if let Err(e) = src_pad.link(&sink_pad) {
                warn!("パッドのリンクに失敗: {:?}", e);
            }
        });

        let bus = pipeline
            .bus()
            .context("パイプラインにバスがありません")?;

        let frames = Self {
            pipeline,
            appsink,
            bus,
            finished: false,
        };

        frames
            .pipeline
            .set_state(gst::State::Playing)
            .context("パイプラインの開始に失敗しました")?;

        Ok(frames)
    }

    fn sample_to_image(sample: &gst::Sample) -> Result<RgbImage> {
        let buffer = sample.buffer().context("サンプルにバッファがありません")?;
        let caps = sample.caps().context("サンプルにcapsがありません")?;
        let video_info = gstreamer_video::VideoInfo::from_caps(caps)
            .context("映像フォーマットを取得できませんでした")?;
        let map = buffer
            .map_readable()
            .context("バッファの読み込みに失敗しました")?;

        copy_rgb_rows(
            map.as_slice(),
            video_info.width(),
            video_info.height(),
            video_info.stride()[0] as usize,
        )
    }

    fn pop_error(&self) -> Option<anyhow::Error> {
        let msg = self.bus.pop_filtered(&[gst::MessageType::Error])?;
        match msg.view() {
            gst::MessageView::Error(err) => Some(anyhow::anyhow!(
                "エラーが発生しました: {} (デバッグ情報: {:?})",
                err.error(),
                err.debug()
            )),
            _ => None,
        }
    }
}

impl FrameSource for GstFrameSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        if self.finished {
            return Ok(None);
        }

        loop {
            if let Some(sample) = self
                .appsink
                .try_pull_sample(gst::ClockTime::from_mseconds(100))
            {
                return Self::sample_to_image(&sample).map(Some);
            }
            if let Some(err) = self.pop_error() {
                self.finished = true;
                return Err(err);
            }
            if self.appsink.is_eos() {
                debug!("動画の終わりに到達しました");
                self.finished = true;
                return Ok(None);
            }
        }
    }
}

impl Drop for GstFrameSource {
    fn drop(&mut self) {
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            warn!("パイプラインの停止に失敗しました: {:?}", e);
        }
    }
}

/// 抽出対象のフレームか（0始まりの通し番号が間隔で割り切れる）
pub fn is_sampled(frame_index: u64, interval: u32) -> bool {
    interval > 0 && frame_index % u64::from(interval) == 0
}

/// 横長フレームを反時計回りに90度回転して縦長にする
pub fn reorient_if_landscape(frame: RgbImage) -> (RgbImage, bool) {
    if frame.width() > frame.height() {
        (imageops::rotate270(&frame), true)
    } else {
        (frame, false)
    }
}

/// 出力ファイル名: `{動画名}_{6桁連番}.jpg`
pub fn frame_filename(base_name: &str, sequence: u64) -> String {
    format!("{}_{:06}.jpg", base_name, sequence)
}

/// 任意のフレームソースから抽出して保存
pub fn extract_from_source<S: FrameSource + ?Sized>(
    source: &mut S,
    base_name: &str,
    config: &ExtractConfig,
) -> Result<ExtractionSummary> {
    if config.frame_interval == 0 {
        return Err(PrepError::InvalidConfig(
            "frame_interval は 1 以上で指定してください".to_string(),
        )
        .into());
    }

    let mut summary = ExtractionSummary::default();

    while let Some(frame) = source.next_frame()? {
        let frame_index = summary.decoded_frames;
        summary.decoded_frames += 1;

        if !is_sampled(frame_index, config.frame_interval) {
            continue;
        }

        let frame = if config.reorient_landscape {
            let (frame, rotated) = reorient_if_landscape(frame);
            if rotated {
                if summary.reoriented_frames == 0 {
                    info!("フレーム {}: 横長から縦長に回転します", frame_index);
                }
                summary.reoriented_frames += 1;
            }
            frame
        } else {
            frame
        };

        let output_path = config
            .output_dir
            .join(frame_filename(base_name, summary.saved.len() as u64));
        save_image(
            &DynamicImage::ImageRgb8(frame),
            &output_path,
            config.jpeg_quality,
        )?;
        summary.saved.push(output_path);

        if config.progress_every > 0 && summary.saved.len() % config.progress_every as usize == 0 {
            info!("{}フレーム保存しました...", summary.saved.len());
        }
    }

    Ok(summary)
}

/// 1本の動画からフレームを抽出
pub fn extract_video(video_path: &Path, config: &ExtractConfig) -> Result<ExtractionSummary> {
    let base_name = video_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string();

    ensure_dir(&config.output_dir)?;

    info!("動画を処理します: {}", video_path.display());
    match probe_video(video_path) {
        Ok(info) => info!(
            "  解像度: {}x{}, FPS: {:.2}, 再生時間: {:.2}秒, 推定フレーム数: {}",
            info.width,
            info.height,
            info.fps,
            info.duration_sec,
            info.estimated_frames()
        ),
        Err(e) => warn!("動画情報の取得に失敗しました: {:#}", e),
    }

    let mut source = GstFrameSource::open(video_path)
        .with_context(|| format!("動画を開けませんでした: {}", video_path.display()))?;
    let summary = extract_from_source(&mut source, &base_name, config)?;

    info!(
        "完了: {} フレーム中 {} フレームを保存しました",
        summary.decoded_frames,
        summary.saved.len()
    );
    Ok(summary)
}

/// ディレクトリ内の全動画を処理
pub fn extract_directory(config: &ExtractConfig) -> Result<BatchReport> {
    config.validate()?;

    let videos = collect_files(&config.video_dir, &config.extensions)?;
    if videos.is_empty() {
        warn!("{} に動画ファイルが見つかりませんでした", config.video_dir.display());
        return Ok(BatchReport::default());
    }

    ensure_dir(&config.output_dir)?;
    info!("{}個の動画ファイルが見つかりました", videos.len());
    info!("抽出間隔: {}フレームごと", config.frame_interval);

    let report = run_batch(&videos, |path| extract_video(path, config).map(|_| ()));
    report.log_summary("フレーム抽出");
    Ok(report)
}

/// 抽出フレーム数の期待値（`ceil(total / interval)`）
pub fn expected_frame_count(total_frames: u64, interval: u32) -> PrepResult<u64> {
    if interval == 0 {
        return Err(PrepError::InvalidConfig(
            "frame_interval は 1 以上で指定してください".to_string(),
        ));
    }
    Ok(total_frames.div_ceil(u64::from(interval)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// 決まった枚数のフレームを返すテスト用ソース
    struct SyntheticSource {
        remaining: u64,
        width: u32,
        height: u32,
    }

    impl FrameSource for SyntheticSource {
        fn next_frame(&mut self) -> Result<Option<RgbImage>> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            Ok(Some(RgbImage::from_pixel(self.width, self.height, Rgb([10, 200, 30]))))
        }
    }

    #[test]
    fn test_extract_config_default() {
        let config = ExtractConfig::default();
        assert_eq!(config.frame_interval, 1);
        assert_eq!(config.jpeg_quality, 95);
        assert!(config.reorient_landscape);
    }

    #[test]
    fn test_sampling() {
        assert!(is_sampled(0, 3));
        assert!(!is_sampled(1, 3));
        assert!(is_sampled(6, 3));
        assert!(!is_sampled(0, 0));
    }

    #[test]
    fn test_frame_filename() {
        assert_eq!(frame_filename("VID_20250527", 1), "VID_20250527_000001.jpg");
        assert_eq!(frame_filename("clip", 123456), "clip_123456.jpg");
    }

    #[test]
    fn test_landscape_is_rotated_ccw() {
        let mut frame = RgbImage::new(1920, 1080);
        frame.put_pixel(1919, 0, Rgb([255, 0, 0]));

        let (rotated, changed) = reorient_if_landscape(frame);
        assert!(changed);
        assert_eq!(rotated.dimensions(), (1080, 1920));
        // 右上の画素は反時計回りで左上に来る
        assert_eq!(*rotated.get_pixel(0, 0), Rgb([255, 0, 0]));
    }

    #[test]
    fn test_portrait_is_untouched() {
        let (frame, changed) = reorient_if_landscape(RgbImage::new(1080, 1920));
        assert!(!changed);
        assert_eq!(frame.dimensions(), (1080, 1920));
    }

    #[test]
    fn test_expected_frame_count() {
        assert_eq!(expected_frame_count(10, 1).unwrap(), 10);
        assert_eq!(expected_frame_count(10, 3).unwrap(), 4);
        assert_eq!(expected_frame_count(9, 3).unwrap(), 3);
        assert!(expected_frame_count(9, 0).is_err());
    }

    #[test]
    fn test_extract_from_source_every_third_frame() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExtractConfig {
            output_dir: dir.path().to_path_buf(),
            frame_interval: 3,
            ..ExtractConfig::default()
        };
        let mut source = SyntheticSource {
            remaining: 10,
            width: 8,
            height: 4,
        };

        let summary = extract_from_source(&mut source, "clip", &config).unwrap();

        assert_eq!(summary.decoded_frames, 10);
        assert_eq!(summary.saved.len(), 4);
        assert_eq!(summary.reoriented_frames, 4);
        assert_eq!(
            summary.saved.last().unwrap().file_name().unwrap(),
            "clip_000003.jpg"
        );
        let first = image::open(&summary.saved[0]).unwrap();
        assert_eq!((first.width(), first.height()), (4, 8));
    }

    #[test]
    fn test_extract_without_reorientation() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExtractConfig {
            output_dir: dir.path().to_path_buf(),
            reorient_landscape: false,
            ..ExtractConfig::default()
        };
        let mut source = SyntheticSource {
            remaining: 2,
            width: 8,
            height: 4,
        };

        let summary = extract_from_source(&mut source, "clip", &config).unwrap();

        assert_eq!(summary.saved.len(), 2);
        assert_eq!(summary.reoriented_frames, 0);
        let first = image::open(&summary.saved[0]).unwrap();
        assert_eq!((first.width(), first.height()), (8, 4));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExtractConfig {
            output_dir: dir.path().to_path_buf(),
            frame_interval: 0,
            ..ExtractConfig::default()
        };
        let mut source = SyntheticSource {
            remaining: 2,
            width: 2,
            height: 2,
        };
        assert!(extract_from_source(&mut source, "clip", &config).is_err());
    }

    /// 行末にパディングを入れた RGB データ（画素値は (x, y, 7)）
    fn padded_rows(width: u32, height: u32, stride: usize) -> Vec<u8> {
        let mut data = vec![0xEE; stride * height as usize];
        for y in 0..height as usize {
            for x in 0..width as usize {
                let offset = y * stride + x * 3;
                data[offset..offset + 3].copy_from_slice(&[x as u8, y as u8, 7]);
            }
        }
        data
    }

    #[test]
    fn test_copy_rgb_rows_drops_padding() {
        let data = padded_rows(5, 3, 16);
        let image = copy_rgb_rows(&data, 5, 3, 16).unwrap();

        assert_eq!(image.dimensions(), (5, 3));
        for (x, y, p) in image.enumerate_pixels() {
            assert_eq!(*p, Rgb([x as u8, y as u8, 7]), "({}, {})", x, y);
        }
    }

    #[test]
    fn test_copy_rgb_rows_last_row_without_padding() {
        // 最終行は stride に満たなくてよい
        let mut data = padded_rows(5, 2, 16);
        data.truncate(16 + 15);
        let image = copy_rgb_rows(&data, 5, 2, 16).unwrap();
        assert_eq!(*image.get_pixel(4, 1), Rgb([4, 1, 7]));
    }

    #[test]
    fn test_copy_rgb_rows_rejects_short_buffer() {
        let data = padded_rows(5, 3, 16);
        assert!(copy_rgb_rows(&data[..16 * 2 + 14], 5, 3, 16).is_err());
        assert!(copy_rgb_rows(&data, 5, 3, 14).is_err());
        assert!(copy_rgb_rows(&data, 0, 3, 16).is_err());
        assert!(copy_rgb_rows(&[], 5, 0, 16).is_err());
    }

    fn rgb_sample(width: u32, height: u32, data: Vec<u8>) -> gst::Sample {
        gst::init().unwrap();
        let info = gstreamer_video::VideoInfo::builder(gstreamer_video::VideoFormat::Rgb, width, height)
            .build()
            .unwrap();
        let caps = info.to_caps().unwrap();
        let buffer = gst::Buffer::from_mut_slice(data);
        gst::Sample::builder().buffer(&buffer).caps(&caps).build()
    }

    #[test]
    fn test_sample_to_image_uses_caps_stride() {
        gst::init().unwrap();
        let info = gstreamer_video::VideoInfo::builder(gstreamer_video::VideoFormat::Rgb, 5, 3)
            .build()
            .unwrap();
        assert_eq!(info.stride()[0], 16);

        let sample = rgb_sample(5, 3, padded_rows(5, 3, 16));
        let image = GstFrameSource::sample_to_image(&sample).unwrap();
        assert_eq!(image.dimensions(), (5, 3));
        for (x, y, p) in image.enumerate_pixels() {
            assert_eq!(*p, Rgb([x as u8, y as u8, 7]), "({}, {})", x, y);
        }
    }

    #[test]
    fn test_sample_to_image_rejects_short_buffer() {
        let sample = rgb_sample(5, 3, vec![0; 20]);
        assert!(GstFrameSource::sample_to_image(&sample).is_err());
    }
}
