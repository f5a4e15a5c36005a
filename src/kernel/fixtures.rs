//! Static content for the overlay: canned queries, log copy, proactive
//! scenarios and the welcome line. Read-only.

use serde::Serialize;

use super::state::GameContext;

pub const AI_NAME: &str = "海克斯助手";

pub const WELCOME_MESSAGE: &str = "欢迎来到召唤师峡谷！AI实时语音助手已就绪。";

// Canned spoken queries
pub const PUSH_TO_TALK_QUERY: &str = "对面那个中单有点肥，我该怎么针对？";
pub const FOLLOW_UP_QUERY: &str = "帮我标记一下对方打野的位置。";
pub const BARGE_IN_UTTERANCE: &str = "别说了，先看这波越塔，能不能杀？";
pub const BARGE_IN_QUERY: &str = "这波越塔能不能杀？";
pub const EMPTY_MENTION_QUERY: &str = "在的，海克斯核心已连接。";

/// Mention token that routes a text-chat message to the assistant.
pub const AI_MENTION: &str = "@ai";

// Provider fallbacks
pub const FALLBACK_REPLY: &str = "海克斯核心负载中，建议先稳住发育。";
pub const EMPTY_REPLY: &str = "数据中心暂时失去同步，请保持专注。";
pub const DEFAULT_PROMPT: &str = "分析当前局势并给出一条核心指令。";

/// Pipeline log copy.
pub mod copy {
    pub fn asr_query(query: &str) -> String {
        format!("识别结果 [QUERY]: \"{}\"", query)
    }
    pub const VAD_END: &str = "VAD状态: 语音结束，音频流已切断";
    pub const NLP_EXTRACT: &str = "意图识别: 正在提取战术核心参数...";
    pub const LLM_REQUEST: &str = "正在向云端模型发起战术分析请求...";
    pub fn llm_result(reply: &str) -> String {
        format!("决策完成 [AI_RESPONSE]: \"{}\"", reply)
    }
    pub const TTS_SYNTH: &str = "海克斯合成引擎合成中 (SampleRate: 24kHz)...";
    pub const TTS_READY: &str = "语音包就绪，通过小队频道下发播放";
    pub const SESSION_CLOSED: &str = "当前会话链路已正常关闭，系统重置为待命状态";

    pub const CAPTURE_START: &str = "采集语音特征中 [Capture Start]";
    pub const CAPTURE_STOP: &str = "音频流采样结束 [Capture Stop]";

    pub const WINDOW_OPENED: &str = "已激活 30s 持续监听窗口";
    pub const WINDOW_FOLLOW_UP: &str = "多轮窗口内捕捉到后续追问指令";
    pub const WINDOW_TIMED_OUT: &str = "30s 多轮交互窗口已超时关闭";
    pub const WINDOW_CLOSED: &str = "多轮交互窗口已手动关闭";

    pub const DUPLEX_HANDSHAKE: &str = "全双工 (Full-Duplex) 实时交互协议已握手成功";
    pub const DUPLEX_READY: &str = "环境噪声自适应特征提取中 [READY]";
    pub const DUPLEX_CLOSED: &str = "全双工连接正常关闭";
    pub fn duplex_broadcast(trigger: &str) -> String {
        format!("[主动播报] 实时监测场景: {}", trigger)
    }
    pub fn duplex_ai_line(line: &str) -> String {
        format!("主动发起对话 [AI_RESPONSE]: \"{}\"", line)
    }
    pub fn duplex_user_line(line: &str) -> String {
        format!("实时转义用户追问 [QUERY]: \"{}\"", line)
    }
    pub fn duplex_reply_line(line: &str) -> String {
        format!("多轮毫秒级反馈 [AI_RESPONSE]: \"{}\"", line)
    }

    pub const BARGE_IN_DETECTED: &str = "!!! 系统监测到用户语音抢断 (Barge-in Activated) !!!";
    pub const BARGE_IN_STOP_TTS: &str = "立即执行中断协议：停止当前 TTS 播报";
    pub fn barge_in_query(utterance: &str) -> String {
        format!("打断内容识别 [QUERY]: \"{}\"", utterance)
    }
}

/// Canned replies, keyed by situation. Used by the offline provider.
pub mod replies {
    pub const DEFAULT: &str = "收到，正在分析局势...";
    pub const DEATH_ANALYSIS: &str =
        "检测到你受到敌方卡特琳娜 800点魔法伤害。建议下一件装备优先合成【饮魔刀】以提升生存率。";
    pub const SHOP_ADVICE: &str =
        "考虑到敌方阵容法伤较多，推荐购买【水银之靴】。如果是顺风局，直接出【无尽之刃】。";
    pub const JUNGLE_TRACKING: &str =
        "敌方打野30秒前出现在上路。由于目前下路兵线过深，建议撤退，以免被包夹。";
    pub const PROACTIVE_Q: &str =
        "注意，大龙将在30秒后刷新，我看你身上还有1500金币，不先回城补给一下吗？";
    pub const ENCOURAGEMENT: &str = "稳住，我们能赢！专注对线和补刀，后期团战我们阵容更有优势。";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DuplexScenario {
    pub trigger: &'static str,
    pub ai: &'static str,
    pub user: &'static str,
    pub reply: &'static str,
}

pub const DUPLEX_SCENARIOS: [DuplexScenario; 3] = [
    DuplexScenario {
        trigger: "视野检测",
        ai: "注意，敌方打野在刚才在河道露头了，正在往你这边走。建议后撤。",
        user: "我知道了，但我能反杀吗？",
        reply: "你的闪现还有30秒。建议稳住，等辅助支援。",
    },
    DuplexScenario {
        trigger: "资源倒计时",
        ai: "大龙还有20秒刷新，我看你身上有2000金币。不考虑回城补个大件？",
        user: "不用，这波先抢视野。",
        reply: "收到。已标记河道草丛，那里可能是敌方埋伏点。",
    },
    DuplexScenario {
        trigger: "经济优势",
        ai: "你已经超神了！目前的经济领先对面中单2500。可以考虑带起推塔节奏。",
        user: "来中路集合推塔。",
        reply: "正在发送全队集结信号。正在分析最佳破塔路径...",
    },
];

/// Suggestion bubbles offered in guided mode for each game situation.
pub fn suggested_queries(context: GameContext) -> &'static [&'static str] {
    match context {
        GameContext::Normal => &["现在该去哪发育？", "队友在干嘛", "帮我分析对线策略"],
        GameContext::Dead => &["复盘死亡原因", "查看伤害来源", "下一波团战怎么打"],
        GameContext::Shopping => &["比较1100金币的两种小件策略", "对面刺客肥了出什么", "推荐核心三件套"],
        GameContext::ObjectiveSpawn => &["小龙1分钟刷新规划任务", "对面打野大概率在哪", "这波团战站位建议"],
    }
}
